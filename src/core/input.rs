// Raw window message vocabulary used by the background injector.
// Values match the Win32 definitions so a platform can post them verbatim.

pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_LBUTTONDBLCLK: u32 = 0x0203;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;

// MK_LBUTTON constant value
pub const MK_LBUTTON: usize = 0x0001;
pub const MK_RBUTTON: usize = 0x0002;

/// One message destined for a target window's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    pub msg: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl RawMessage {
    pub fn new(msg: u32, wparam: usize, lparam: isize) -> Self {
        Self { msg, wparam, lparam }
    }

    pub fn left_down(x: i32, y: i32) -> Self {
        Self::new(WM_LBUTTONDOWN, MK_LBUTTON, make_lparam(x, y))
    }

    pub fn left_up(x: i32, y: i32) -> Self {
        Self::new(WM_LBUTTONUP, 0, make_lparam(x, y))
    }

    pub fn left_double(x: i32, y: i32) -> Self {
        Self::new(WM_LBUTTONDBLCLK, MK_LBUTTON, make_lparam(x, y))
    }

    pub fn right_down(x: i32, y: i32) -> Self {
        Self::new(WM_RBUTTONDOWN, MK_RBUTTON, make_lparam(x, y))
    }

    pub fn right_up(x: i32, y: i32) -> Self {
        Self::new(WM_RBUTTONUP, 0, make_lparam(x, y))
    }

    /// Mouse move with the left button held, as sent during a drag.
    pub fn drag_move(x: i32, y: i32) -> Self {
        Self::new(WM_MOUSEMOVE, MK_LBUTTON, make_lparam(x, y))
    }

    pub fn key_down(vk: u16, scan_code: u32) -> Self {
        // repeat count 1
        let lparam = (scan_code << 16) | 1;
        Self::new(WM_KEYDOWN, vk as usize, lparam as isize)
    }

    pub fn key_up(vk: u16, scan_code: u32) -> Self {
        // repeat count 1, previous state down, transition state up
        let lparam = (scan_code << 16) | 0xC000_0001;
        Self::new(WM_KEYUP, vk as usize, lparam as isize)
    }

    /// One UTF-16 code unit of typed text.
    pub fn char_unit(unit: u16) -> Self {
        Self::new(WM_CHAR, unit as usize, 0)
    }

    /// Client coordinates packed in the lparam, for mouse messages.
    pub fn point(&self) -> (i32, i32) {
        let raw = self.lparam as u32;
        ((raw & 0xFFFF) as u16 as i16 as i32, (raw >> 16) as u16 as i16 as i32)
    }
}

/// Create lParam: low word = x, high word = y
pub fn make_lparam(x: i32, y: i32) -> isize {
    let lparam_value = ((y as u32) << 16) | (x as u32 & 0xFFFF);
    lparam_value as isize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lparam_packs_low_x_high_y() {
        assert_eq!(make_lparam(0x12, 0x34), 0x0034_0012);
        assert_eq!(RawMessage::left_down(640, 360).point(), (640, 360));
    }

    #[test]
    fn key_messages_carry_scan_code_and_transition_bits() {
        let down = RawMessage::key_down(0x0D, 0x1C);
        assert_eq!(down.msg, WM_KEYDOWN);
        assert_eq!(down.wparam, 0x0D);
        assert_eq!(down.lparam as u32, 0x001C_0001);

        let up = RawMessage::key_up(0x0D, 0x1C);
        assert_eq!(up.msg, WM_KEYUP);
        assert_eq!(up.lparam as u32, 0xC01C_0001);
    }

    #[test]
    fn button_flags_follow_press_state() {
        assert_eq!(RawMessage::left_down(1, 1).wparam, MK_LBUTTON);
        assert_eq!(RawMessage::left_up(1, 1).wparam, 0);
        assert_eq!(RawMessage::right_down(1, 1).wparam, MK_RBUTTON);
        assert_eq!(RawMessage::drag_move(5, 5).wparam, MK_LBUTTON);
    }
}
