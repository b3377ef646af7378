use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{match_template_parallel, MatchTemplateMethod};

/// Windows whose intensity variance is below this are treated as flat.
const FLAT_VARIANCE: f64 = 1e-6;

fn sanitize(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Best zero-mean normalized cross-correlation (correlation coefficient) of
/// `template` anywhere inside `region`. Flat windows and flat templates
/// score 0. `None` when the template is empty or does not fit.
pub fn best_match_score(region: &GrayImage, template: &GrayImage) -> Option<f32> {
    best_coefficient(&[region], &[template])
}

/// Colour variant of [`best_match_score`]: the three channels are treated as
/// one vector, so equal-intensity templates of different hue do not match.
pub fn best_color_match_score(region: &RgbImage, template: &RgbImage) -> Option<f32> {
    let r = split_channels(region);
    let t = split_channels(template);
    best_coefficient(&[&r[0], &r[1], &r[2]], &[&t[0], &t[1], &t[2]])
}

/// Whole-frame similarity. Both images are scaled to a common size no larger
/// than either image or `max_size` and correlated.
pub fn compare_frames(frame: &GrayImage, reference: &GrayImage, max_size: (u32, u32)) -> f32 {
    let width = frame.width().min(reference.width()).min(max_size.0);
    let height = frame.height().min(reference.height()).min(max_size.1);
    if width == 0 || height == 0 {
        return 0.0;
    }

    let frame = scaled(frame, width, height);
    let reference = scaled(reference, width, height);
    best_match_score(&frame, &reference).unwrap_or(0.0)
}

fn scaled(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, FilterType::Triangle)
    }
}

fn split_channels(image: &RgbImage) -> [GrayImage; 3] {
    let (width, height) = image.dimensions();
    [0, 1, 2].map(|c| GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y)[c]])))
}

/// Correlation coefficient over paired channels. The raw cross-correlation
/// comes from imageproc; window means and variances come from integral
/// images, so each placement costs O(1) on top of the correlation itself.
fn best_coefficient(regions: &[&GrayImage], templates: &[&GrayImage]) -> Option<f32> {
    let (region_w, region_h) = regions.first()?.dimensions();
    let (tw, th) = templates.first()?.dimensions();
    if tw == 0 || th == 0 || tw > region_w || th > region_h {
        return None;
    }
    let n = f64::from(tw) * f64::from(th);

    let mut template_variance = 0.0;
    let channels: Vec<_> = regions
        .iter()
        .zip(templates)
        .map(|(&region, &template)| {
            let mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
            template_variance += template
                .pixels()
                .map(|p| (f64::from(p[0]) - mean).powi(2))
                .sum::<f64>();
            let cross = match_template_parallel(region, template, MatchTemplateMethod::CrossCorrelation);
            let sums = integral_image::<_, u64>(region);
            let squares = integral_squared_image::<_, u64>(region);
            (mean, cross, sums, squares)
        })
        .collect();
    if template_variance <= FLAT_VARIANCE {
        return Some(0.0);
    }

    let (out_w, out_h) = (region_w - tw + 1, region_h - th + 1);
    let mut best = 0.0_f64;
    for y in 0..out_h {
        for x in 0..out_w {
            let mut numerator = 0.0;
            let mut window_variance = 0.0;
            for (mean, cross, sums, squares) in &channels {
                let sum = window_sum(|px, py| sums.get_pixel(px, py)[0], x, y, tw, th);
                let square_sum = window_sum(|px, py| squares.get_pixel(px, py)[0], x, y, tw, th);
                numerator += f64::from(cross.get_pixel(x, y)[0]) - mean * sum;
                window_variance += square_sum - sum * sum / n;
            }
            if window_variance <= FLAT_VARIANCE {
                continue;
            }
            let score = numerator / (window_variance.sqrt() * template_variance.sqrt());
            if score > best {
                best = score;
            }
        }
    }
    Some(sanitize(best as f32))
}

/// Sum over the `w`x`h` window at (x, y), read from an integral image that is
/// one pixel larger than its source in each direction.
fn window_sum(at: impl Fn(u32, u32) -> u64, x: u32, y: u32, w: u32, h: u32) -> f64 {
    let total = at(x + w, y + h) + at(x, y) - at(x, y + h) - at(x + w, y);
    total as f64
}
