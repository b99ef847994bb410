use eframe::egui;
use image::{imageops, GrayImage, Luma};
use ndarray::Array2;

// ---------------------------------------------------------------------------
// Array2<u8> -> GrayImage -> egui texture
// ---------------------------------------------------------------------------

/// Build a grayscale image from normalized intensities. Array row `r`
/// becomes image row `r`, or row `height - 1 - r` when `origin_lower` is set.
pub fn to_gray_image(intensities: &Array2<u8>, origin_lower: bool) -> GrayImage {
    let (height, width) = intensities.dim();
    let img = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([intensities[[y as usize, x as usize]]])
    });
    if origin_lower {
        imageops::flip_vertical(&img)
    } else {
        img
    }
}

/// Hand a grayscale image to egui.
pub fn to_color_image(img: &GrayImage) -> egui::ColorImage {
    let size = [img.width() as usize, img.height() as usize];
    egui::ColorImage::from_gray(size, img.as_raw())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn rows_stay_in_order_by_default() {
        let img = to_gray_image(&array![[0u8, 10, 20], [30, 40, 50]], false);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 0).0, [20]);
        assert_eq!(img.get_pixel(0, 1).0, [30]);
    }

    #[test]
    fn lower_origin_flips_rows() {
        let img = to_gray_image(&array![[1u8, 2], [3, 4], [5, 6]], true);
        assert_eq!(img.as_raw(), &vec![5, 6, 3, 4, 1, 2]);
    }

    #[test]
    fn color_image_matches_size() {
        let img = to_gray_image(&array![[255u8, 0, 128, 64]], false);
        let color = to_color_image(&img);
        assert_eq!(color.size, [4, 1]);
        assert_eq!(color.pixels[0], egui::Color32::from_gray(255));
        assert_eq!(color.pixels[2], egui::Color32::from_gray(128));
    }
}
