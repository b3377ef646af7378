use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::automation::keys::KeyCombo;
use crate::config::InputTiming;
use crate::core::control::RunControl;
use crate::core::coords::{denormalize_point, lerp_point, RelPoint};
use crate::core::error::{ActionError, WindowError};
use crate::core::input::RawMessage;
use crate::core::platform::{WindowHandle, WindowSystem};
use crate::models::action::{Action, ActionKind};

/// Replays actions by posting messages to the target window's queue.
///
/// Nothing here calls OS-wide input APIs: the user's cursor and keyboard
/// focus stay untouched. Press/release pairs are never split by a stop
/// request; drags, text and waits check the [`RunControl`] between steps.
pub struct BackgroundInjector {
    system: Arc<dyn WindowSystem>,
    timing: InputTiming,
}

impl BackgroundInjector {
    pub fn new(system: Arc<dyn WindowSystem>, timing: InputTiming) -> Self {
        Self { system, timing }
    }

    /// Execute one action against `handle`, then sleep its `delay_after`.
    ///
    /// Coordinates are resolved against the client size queried now, never a
    /// cached one. Post failures are reported through `log` with the OS
    /// reason before being returned.
    pub fn execute(
        &self,
        action: &Action,
        handle: WindowHandle,
        control: &RunControl,
        log: &mut dyn FnMut(String),
    ) -> Result<(), ActionError> {
        control.checkpoint()?;

        if !self.system.is_valid(handle) {
            log(format!("window {} is no longer valid", handle));
            return Err(WindowError::InvalidWindow.into());
        }
        let client = self.system.client_size(handle)?;
        if client.0 == 0 || client.1 == 0 {
            log(format!("window {} has an empty client area", handle));
            return Err(WindowError::ZeroClientArea.into());
        }

        let result = match &action.kind {
            ActionKind::Click { at } => {
                let (x, y) = denormalize_point(*at, client);
                self.press_pair(handle, RawMessage::left_down(x, y), RawMessage::left_up(x, y))
            }
            ActionKind::DoubleClick { at } => {
                let (x, y) = denormalize_point(*at, client);
                self.press_pair(handle, RawMessage::left_double(x, y), RawMessage::left_up(x, y))
            }
            ActionKind::RightClick { at } => {
                let (x, y) = denormalize_point(*at, client);
                self.press_pair(handle, RawMessage::right_down(x, y), RawMessage::right_up(x, y))
            }
            ActionKind::Drag { from, to } => self.drag(handle, *from, *to, client, control),
            ActionKind::KeyPress { keys } => self.key_press(handle, keys),
            ActionKind::InputText { text } => self.input_text(handle, text, control),
            ActionKind::Wait { duration_ms } => control
                .sleep(Duration::from_millis(*duration_ms))
                .map_err(ActionError::from),
        };

        if let Err(ActionError::Window(WindowError::PostFailed(reason))) = &result {
            log(format!("{}: message post failed: {}", action.label(), reason));
        }
        result?;

        // Only observed at the next action boundary
        if action.delay_after_ms > 0 {
            thread::sleep(Duration::from_millis(action.delay_after_ms));
        }
        Ok(())
    }

    fn post(&self, handle: WindowHandle, message: RawMessage) -> Result<(), WindowError> {
        self.system.post_message(handle, message)
    }

    fn press_pair(&self, handle: WindowHandle, down: RawMessage, up: RawMessage) -> Result<(), ActionError> {
        self.post(handle, down)?;
        thread::sleep(self.timing.click_gap());
        self.post(handle, up)?;
        Ok(())
    }

    /// Press at `from`, move in a straight line to `to`, release. A stop
    /// mid-drag skips the remaining moves but still releases the button.
    fn drag(
        &self,
        handle: WindowHandle,
        from: RelPoint,
        to: RelPoint,
        client: (u32, u32),
        control: &RunControl,
    ) -> Result<(), ActionError> {
        let start = denormalize_point(from, client);
        let end = denormalize_point(to, client);
        let steps = self.timing.drag_steps.max(1);

        self.post(handle, RawMessage::left_down(start.0, start.1))?;
        thread::sleep(self.timing.click_gap());

        let mut last = start;
        let mut outcome: Result<(), ActionError> = Ok(());
        for step in 0..=steps {
            if let Err(stopped) = control.checkpoint() {
                outcome = Err(stopped.into());
                break;
            }
            let (x, y) = lerp_point(start, end, step, steps);
            if let Err(e) = self.post(handle, RawMessage::drag_move(x, y)) {
                outcome = Err(e.into());
                break;
            }
            last = (x, y);
            thread::sleep(self.timing.drag_step_delay());
        }

        let release_at = if outcome.is_ok() { end } else { last };
        let released = self.post(handle, RawMessage::left_up(release_at.0, release_at.1));
        outcome?;
        released?;
        Ok(())
    }

    /// Modifiers down in listed order, main key down/up, modifiers up in
    /// reverse. Modifiers that went down are always released.
    fn key_press(&self, handle: WindowHandle, keys: &KeyCombo) -> Result<(), ActionError> {
        let resolved = keys.resolve()?;

        let mut pressed: Vec<u16> = Vec::with_capacity(resolved.modifiers.len());
        let mut outcome: Result<(), ActionError> = Ok(());
        for &vk in &resolved.modifiers {
            if let Err(e) = self.post(handle, RawMessage::key_down(vk, self.system.scan_code(vk))) {
                outcome = Err(e.into());
                break;
            }
            pressed.push(vk);
            thread::sleep(self.timing.modifier_gap());
        }

        if outcome.is_ok() {
            if let Some(vk) = resolved.key {
                let scan = self.system.scan_code(vk);
                outcome = self.press_pair(handle, RawMessage::key_down(vk, scan), RawMessage::key_up(vk, scan));
            }
        }

        for &vk in pressed.iter().rev() {
            let released = self.post(handle, RawMessage::key_up(vk, self.system.scan_code(vk)));
            if outcome.is_ok() {
                outcome = released.map_err(ActionError::from);
            }
            thread::sleep(self.timing.modifier_gap());
        }
        outcome
    }

    /// One WM_CHAR per UTF-16 code unit; surrogate pairs go out as two.
    fn input_text(&self, handle: WindowHandle, text: &str, control: &RunControl) -> Result<(), ActionError> {
        for unit in text.encode_utf16() {
            control.checkpoint()?;
            self.post(handle, RawMessage::char_unit(unit))?;
            control.sleep(self.timing.char_delay())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::keys::{VK_CONTROL, VK_RETURN, VK_SHIFT};
    use crate::core::fake::FakeWindowSystem;
    use crate::core::input::{WM_CHAR, WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE};
    use std::time::Instant;

    fn setup(timing: InputTiming) -> (Arc<FakeWindowSystem>, WindowHandle, BackgroundInjector) {
        let fake = Arc::new(FakeWindowSystem::new());
        let handle = fake.add_window("Game", (800, 600));
        let injector = BackgroundInjector::new(fake.clone(), timing);
        (fake, handle, injector)
    }

    fn run(injector: &BackgroundInjector, action: &Action, handle: WindowHandle) -> Result<(), ActionError> {
        injector.execute(action, handle, &RunControl::default(), &mut |_| {})
    }

    fn click(x: f32, y: f32) -> Action {
        Action::new("click", ActionKind::Click { at: RelPoint::new(x, y) })
    }

    #[test]
    fn click_targets_current_client_size() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        let action = click(0.5, 0.25);

        run(&injector, &action, handle).unwrap();
        fake.set_client_size(handle, (1000, 1000));
        run(&injector, &action, handle).unwrap();

        let posted = fake.posted();
        assert_eq!(
            posted,
            vec![
                RawMessage::left_down(400, 150),
                RawMessage::left_up(400, 150),
                RawMessage::left_down(500, 250),
                RawMessage::left_up(500, 250),
            ]
        );
    }

    #[test]
    fn click_keeps_press_release_gap() {
        let (fake, handle, injector) = setup(InputTiming::default());
        run(&injector, &click(0.1, 0.1), handle).unwrap();

        let timed = fake.posted_timed();
        assert_eq!(timed.len(), 2);
        assert!(timed[1].0 - timed[0].0 >= Duration::from_millis(45));
    }

    #[test]
    fn double_and_right_click_messages() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        let at = RelPoint::new(0.0, 1.0);
        run(&injector, &Action::new("", ActionKind::DoubleClick { at }), handle).unwrap();
        run(&injector, &Action::new("", ActionKind::RightClick { at }), handle).unwrap();

        assert_eq!(
            fake.posted(),
            vec![
                RawMessage::left_double(0, 600),
                RawMessage::left_up(0, 600),
                RawMessage::right_down(0, 600),
                RawMessage::right_up(0, 600),
            ]
        );
    }

    #[test]
    fn key_combo_presses_in_order_and_releases_in_reverse() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        let action = Action::new("save", ActionKind::KeyPress { keys: "ctrl+shift+s".into() });
        run(&injector, &action, handle).unwrap();

        let scan = |vk: u16| vk as u32 + 0x100;
        let s = b'S' as u16;
        assert_eq!(
            fake.posted(),
            vec![
                RawMessage::key_down(VK_CONTROL, scan(VK_CONTROL)),
                RawMessage::key_down(VK_SHIFT, scan(VK_SHIFT)),
                RawMessage::key_down(s, scan(s)),
                RawMessage::key_up(s, scan(s)),
                RawMessage::key_up(VK_SHIFT, scan(VK_SHIFT)),
                RawMessage::key_up(VK_CONTROL, scan(VK_CONTROL)),
            ]
        );
    }

    #[test]
    fn single_key_press() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        run(&injector, &Action::new("", ActionKind::KeyPress { keys: "enter".into() }), handle).unwrap();

        let posted = fake.posted();
        assert_eq!(posted.len(), 2);
        assert_eq!((posted[0].msg, posted[0].wparam), (WM_KEYDOWN, VK_RETURN as usize));
        assert_eq!((posted[1].msg, posted[1].wparam), (WM_KEYUP, VK_RETURN as usize));
    }

    #[test]
    fn bad_key_fails_without_posting() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        let action = Action::new("", ActionKind::KeyPress { keys: "ctrl+nope".into() });
        assert_eq!(
            run(&injector, &action, handle),
            Err(ActionError::BadKey("ctrl+nope".to_string()))
        );
        assert!(fake.posted().is_empty());
    }

    #[test]
    fn text_is_sent_as_utf16_units() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        let action = Action::new("", ActionKind::InputText { text: "hé😀".to_string() });
        run(&injector, &action, handle).unwrap();

        let units: Vec<usize> = fake
            .posted()
            .iter()
            .inspect(|m| assert_eq!(m.msg, WM_CHAR))
            .map(|m| m.wparam)
            .collect();
        let expected: Vec<usize> = "hé😀".encode_utf16().map(|u| u as usize).collect();
        assert_eq!(units, expected);
        assert_eq!(units.len(), 4);
    }

    #[test]
    fn drag_interpolates_then_releases_at_end() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        let action = Action::new(
            "",
            ActionKind::Drag {
                from: RelPoint::new(0.0, 0.0),
                to: RelPoint::new(1.0, 0.5),
            },
        );
        run(&injector, &action, handle).unwrap();

        let posted = fake.posted();
        // down, steps + 1 moves, up
        assert_eq!(posted.len(), 1 + 5 + 1);
        assert_eq!(posted[0], RawMessage::left_down(0, 0));
        let moves: Vec<(i32, i32)> = posted[1..6]
            .iter()
            .inspect(|m| assert_eq!(m.msg, WM_MOUSEMOVE))
            .map(|m| m.point())
            .collect();
        assert_eq!(moves, vec![(0, 0), (200, 75), (400, 150), (600, 225), (800, 300)]);
        assert_eq!(posted[6], RawMessage::left_up(800, 300));
    }

    #[test]
    fn stopped_drag_still_releases_button() {
        let timing = InputTiming {
            drag_steps: 20,
            drag_step_delay_ms: 20,
            ..InputTiming::immediate()
        };
        let (fake, handle, injector) = setup(timing);
        let control = RunControl::new(Duration::from_millis(10));
        let remote = control.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.stop();
        });

        let action = Action::new(
            "",
            ActionKind::Drag {
                from: RelPoint::new(0.0, 0.0),
                to: RelPoint::new(1.0, 1.0),
            },
        );
        let result = injector.execute(&action, handle, &control, &mut |_| {});
        stopper.join().unwrap();

        assert_eq!(result, Err(ActionError::Stopped));
        let posted = fake.posted();
        let moves: Vec<&RawMessage> = posted.iter().filter(|m| m.msg == WM_MOUSEMOVE).collect();
        assert!(!moves.is_empty() && moves.len() < 21, "{} moves", moves.len());
        let last = posted.last().unwrap();
        assert_eq!(last.msg, WM_LBUTTONUP);
        assert_eq!(last.point(), moves[moves.len() - 1].point());
        assert_eq!(posted[0].msg, WM_LBUTTONDOWN);
    }

    #[test]
    fn wait_is_cut_short_by_stop() {
        let (_fake, handle, injector) = setup(InputTiming::immediate());
        let control = RunControl::new(Duration::from_millis(10));
        let remote = control.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.stop();
        });

        let started = Instant::now();
        let action = Action::new("", ActionKind::Wait { duration_ms: 5_000 });
        let result = injector.execute(&action, handle, &control, &mut |_| {});
        stopper.join().unwrap();

        assert_eq!(result, Err(ActionError::Stopped));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn closed_window_fails_without_posting() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        fake.close(handle);
        let mut lines = Vec::new();
        let result = injector.execute(&click(0.5, 0.5), handle, &RunControl::default(), &mut |l| lines.push(l));

        assert_eq!(result, Err(ActionError::Window(WindowError::InvalidWindow)));
        assert!(fake.posted().is_empty());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn zero_client_area_fails() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        fake.set_client_size(handle, (0, 600));
        assert_eq!(
            run(&injector, &click(0.5, 0.5), handle),
            Err(ActionError::Window(WindowError::ZeroClientArea))
        );
        assert!(fake.posted().is_empty());
    }

    #[test]
    fn post_failure_is_reported_through_callback() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        fake.fail_posts(true);
        let mut lines = Vec::new();
        let result = injector.execute(&click(0.5, 0.5), handle, &RunControl::default(), &mut |l| lines.push(l));

        assert!(matches!(result, Err(ActionError::Window(WindowError::PostFailed(_)))));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("queue full"), "{}", lines[0]);
    }

    #[test]
    fn stop_before_action_posts_nothing() {
        let (fake, handle, injector) = setup(InputTiming::immediate());
        let control = RunControl::default();
        control.stop();
        assert_eq!(
            injector.execute(&click(0.5, 0.5), handle, &control, &mut |_| {}),
            Err(ActionError::Stopped)
        );
        assert!(fake.posted().is_empty());
    }

    #[test]
    fn delay_after_follows_success() {
        let (_fake, handle, injector) = setup(InputTiming::immediate());
        let action = click(0.5, 0.5).with_delay_after(80);
        let started = Instant::now();
        run(&injector, &action, handle).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}
