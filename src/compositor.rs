use image::{Rgba, RgbaImage};

/// Opaque white, the background for any canvas area a source image does not
/// cover. Padding with white instead of transparent keeps uncovered regions
/// from registering as spurious diff signal.
pub const CANVAS_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Copies `img` onto a white `width`x`height` canvas, anchored at the top-left
/// origin. No centering and no scaling; callers that need a shared size pick
/// the max of both inputs via [`composite_pair`].
pub fn expand_to_canvas(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    debug_assert!(width >= img.width() && height >= img.height());

    let mut canvas = RgbaImage::from_pixel(width, height, CANVAS_BACKGROUND);
    for (x, y, pixel) in img.enumerate_pixels() {
        canvas.put_pixel(x, y, *pixel);
    }
    canvas
}

/// Normalizes two arbitrarily-sized images onto equal-dimension canvases of
/// width = max(widths) and height = max(heights). Screenshots of the same page
/// taken at different times commonly differ in page length; anchoring both at
/// the origin keeps the most stable content (the top of the page) aligned.
pub fn composite_pair(a: &RgbaImage, b: &RgbaImage) -> (RgbaImage, RgbaImage) {
    let width = a.width().max(b.width());
    let height = a.height().max(b.height());
    (
        expand_to_canvas(a, width, height),
        expand_to_canvas(b, width, height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn equal_sizes_pass_through_unchanged() {
        let a = solid(10, 8, [1, 2, 3, 255]);
        let b = solid(10, 8, [9, 8, 7, 255]);
        let (ca, cb) = composite_pair(&a, &b);
        assert_eq!(ca.dimensions(), (10, 8));
        assert_eq!(cb.dimensions(), (10, 8));
        assert_eq!(ca, a);
        assert_eq!(cb, b);
    }

    #[test]
    fn mixed_dimensions_take_max_of_each_axis() {
        // One image larger in width, the other in height; both still land at
        // the origin of a 100x60 canvas.
        let a = solid(100, 50, [0, 0, 0, 255]);
        let b = solid(80, 60, [0, 0, 255, 255]);
        let (ca, cb) = composite_pair(&a, &b);
        assert_eq!(ca.dimensions(), (100, 60));
        assert_eq!(cb.dimensions(), (100, 60));
    }

    #[test]
    fn uncovered_rows_are_opaque_white() {
        let a = solid(100, 50, [10, 20, 30, 255]);
        let b = solid(80, 60, [40, 50, 60, 255]);
        let (ca, _) = composite_pair(&a, &b);

        for y in 50..60 {
            for x in 0..100 {
                assert_eq!(
                    *ca.get_pixel(x, y),
                    CANVAS_BACKGROUND,
                    "row {y} should be background white"
                );
            }
        }
        // Covered area is untouched.
        assert_eq!(*ca.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*ca.get_pixel(99, 49), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn uncovered_columns_are_opaque_white() {
        let a = solid(100, 50, [10, 20, 30, 255]);
        let b = solid(80, 60, [40, 50, 60, 255]);
        let (_, cb) = composite_pair(&a, &b);

        for x in 80..100 {
            for y in 0..60 {
                assert_eq!(*cb.get_pixel(x, y), CANVAS_BACKGROUND);
            }
        }
        assert_eq!(*cb.get_pixel(79, 59), Rgba([40, 50, 60, 255]));
    }

    #[test]
    fn source_alpha_is_preserved_on_the_canvas() {
        let a = solid(2, 2, [100, 100, 100, 128]);
        let canvas = expand_to_canvas(&a, 4, 4);
        assert_eq!(*canvas.get_pixel(1, 1), Rgba([100, 100, 100, 128]));
        assert_eq!(*canvas.get_pixel(3, 3), CANVAS_BACKGROUND);
    }
}
