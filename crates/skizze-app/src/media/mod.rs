#[cfg(feature = "video")]
pub mod movie;

#[cfg(feature = "video")]
pub use movie::Movie;

use thiserror::Error;

/// Why a movie session could not be constructed. Each variant maps to one
/// hard-fail point of the open sequence; no partial session is ever returned.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("could not open {path}: {detail}")]
    Open { path: String, detail: String },
    #[error("no video stream in {0}")]
    NoVideoStream(String),
    #[error("no decoder for video stream: {0}")]
    Decoder(String),
    #[error("could not create color conversion context: {0}")]
    Converter(String),
}

/// Channel count of the conversion target. RGBA when the caller has no
/// preference (`requested < 0`), explicitly asks for 4, or the source
/// carries a fourth component; RGB otherwise.
pub fn target_channels(requested: i32, source_components: u32) -> u32 {
    if requested < 0 || requested == 4 || source_components == 4 {
        4
    } else {
        3
    }
}

/// Expand RGB24 rows (possibly stride-padded) into packed RGBA8 with opaque
/// alpha. `dst` is resized to exactly `width * height * 4`.
pub fn expand_rgb_to_rgba(
    src: &[u8],
    src_stride: usize,
    width: usize,
    height: usize,
    dst: &mut Vec<u8>,
) {
    dst.clear();
    dst.reserve(width * height * 4);
    for row in 0..height {
        let line = &src[row * src_stride..row * src_stride + width * 3];
        for px in line.chunks_exact(3) {
            dst.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_preference_defaults_to_rgba() {
        assert_eq!(target_channels(-1, 3), 4);
        assert_eq!(target_channels(-1, 1), 4);
    }

    #[test]
    fn four_component_source_forces_rgba() {
        assert_eq!(target_channels(3, 4), 4);
        assert_eq!(target_channels(4, 4), 4);
    }

    #[test]
    fn rgba_hint_forces_rgba_on_rgb_sources() {
        assert_eq!(target_channels(4, 3), 4);
    }

    #[test]
    fn three_component_source_with_rgb_hint_stays_rgb() {
        assert_eq!(target_channels(3, 3), 3);
        assert_eq!(target_channels(0, 2), 3);
    }

    #[test]
    fn rgb_expansion_is_packed_and_opaque() {
        // 2x2 image, tight stride
        let src = [
            1, 2, 3, 4, 5, 6, //
            7, 8, 9, 10, 11, 12,
        ];
        let mut dst = Vec::new();
        expand_rgb_to_rgba(&src, 6, 2, 2, &mut dst);
        assert_eq!(
            dst,
            vec![1, 2, 3, 255, 4, 5, 6, 255, 7, 8, 9, 255, 10, 11, 12, 255]
        );
    }

    #[test]
    fn rgb_expansion_skips_stride_padding() {
        // 1x2 image, stride 8 (5 bytes of padding per row)
        let src = [
            1, 2, 3, 0, 0, 0, 0, 0, //
            4, 5, 6, 0, 0, 0, 0, 0,
        ];
        let mut dst = Vec::new();
        expand_rgb_to_rgba(&src, 8, 1, 2, &mut dst);
        assert_eq!(dst, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn rgb_expansion_is_deterministic_across_calls() {
        let src = [9, 8, 7, 6, 5, 4];
        let mut first = Vec::new();
        let mut second = Vec::new();
        expand_rgb_to_rgba(&src, 3, 1, 2, &mut first);
        expand_rgb_to_rgba(&src, 3, 1, 2, &mut second);
        assert_eq!(first, second);
    }
}
