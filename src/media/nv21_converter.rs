// SPDX-License-Identifier: GPL-3.0-only

//! Multi-plane YUV 4:2:0 to NV21 conversion
//!
//! Sensors deliver three planes with independent row and pixel strides. The
//! processing stage wants NV21: the luma plane followed by one interleaved
//! chroma plane holding V,U pairs. A pixel stride of 1 (planar chroma) and 2
//! (semi-planar chroma) go through the same indexing:
//!
//! ```text
//! idx = row * row_stride + col * pixel_stride
//! ```

use crate::backends::camera::types::{PlaneBuffer, RawFrame};
use crate::errors::{Plane, PipelineError, PipelineResult};
use tracing::trace;

/// NV21 frame: luma followed by interleaved V,U pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleavedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Output length for a luma plane of `y_size` bytes and the given dimensions
///
/// Odd dimensions truncate the chroma grid by integer division.
pub fn interleaved_len(y_size: usize, width: u32, height: u32) -> usize {
    y_size + 2 * (height / 2) as usize * (width / 2) as usize
}

/// Convert a raw frame into a newly allocated NV21 frame
pub fn convert_to_nv21(frame: &RawFrame) -> PipelineResult<InterleavedFrame> {
    let mut data = Vec::new();
    convert_into(frame, &mut data)?;
    Ok(InterleavedFrame {
        data,
        width: frame.width,
        height: frame.height,
    })
}

/// Convert a raw frame into `out`, reusing its allocation
///
/// On error `out` is left empty and nothing outside the planes is read.
pub fn convert_into(frame: &RawFrame, out: &mut Vec<u8>) -> PipelineResult<()> {
    out.clear();

    let chroma_w = (frame.width / 2) as usize;
    let chroma_h = (frame.height / 2) as usize;

    // The U and V planes share strides (as the sensor reports them on U)
    let row_stride = frame.u.row_stride as usize;
    let pixel_stride = frame.u.pixel_stride as usize;

    if chroma_w > 0 && chroma_h > 0 {
        let last_idx = (chroma_h - 1) * row_stride + (chroma_w - 1) * pixel_stride;
        check_bounds(Plane::U, &frame.u, last_idx)?;
        check_bounds(Plane::V, &frame.v, last_idx)?;
    }

    let y_size = frame.y.len();
    out.reserve(interleaved_len(y_size, frame.width, frame.height));
    out.extend_from_slice(&frame.y.data);

    let u_plane = &frame.u.data;
    let v_plane = &frame.v.data;
    for row in 0..chroma_h {
        let row_start = row * row_stride;
        for col in 0..chroma_w {
            let idx = row_start + col * pixel_stride;
            out.push(v_plane[idx]);
            out.push(u_plane[idx]);
        }
    }

    trace!(
        width = frame.width,
        height = frame.height,
        bytes = out.len(),
        "Converted frame to NV21"
    );
    Ok(())
}

fn check_bounds(plane: Plane, buffer: &PlaneBuffer, index: usize) -> PipelineResult<()> {
    if index >= buffer.len() {
        return Err(PipelineError::BufferBounds {
            plane,
            index,
            len: buffer.len(),
        });
    }
    Ok(())
}

/// Split a tightly packed I420 buffer (Y, then U, then V) into a raw frame
pub fn raw_frame_from_i420(data: &[u8], width: u32, height: u32) -> PipelineResult<RawFrame> {
    let y_size = width as usize * height as usize;
    let chroma_w = (width / 2) as usize;
    let chroma_size = chroma_w * (height / 2) as usize;
    let expected = y_size + 2 * chroma_size;

    if data.len() < expected {
        return Err(PipelineError::BufferBounds {
            plane: if data.len() < y_size {
                Plane::Y
            } else if data.len() < y_size + chroma_size {
                Plane::U
            } else {
                Plane::V
            },
            index: expected - 1,
            len: data.len(),
        });
    }

    let (y, rest) = data.split_at(y_size);
    let (u, rest) = rest.split_at(chroma_size);
    let v = &rest[..chroma_size];

    Ok(RawFrame::new(
        width,
        height,
        PlaneBuffer::new(y.to_vec(), width, 1),
        PlaneBuffer::new(u.to_vec(), chroma_w as u32, 1),
        PlaneBuffer::new(v.to_vec(), chroma_w as u32, 1),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planar_frame(width: u32, height: u32) -> RawFrame {
        let y: Vec<u8> = (0..width * height).map(|i| i as u8).collect();
        let chroma = ((width / 2) * (height / 2)) as usize;
        let u: Vec<u8> = (0..chroma).map(|i| 100 + i as u8).collect();
        let v: Vec<u8> = (0..chroma).map(|i| 200 + i as u8).collect();
        RawFrame::new(
            width,
            height,
            PlaneBuffer::new(y, width, 1),
            PlaneBuffer::new(u, width / 2, 1),
            PlaneBuffer::new(v, width / 2, 1),
        )
    }

    #[test]
    fn test_4x4_planar_fixture() {
        let out = convert_to_nv21(&planar_frame(4, 4)).expect("conversion");

        let mut expected: Vec<u8> = (0..16).collect();
        expected.extend_from_slice(&[200, 100, 201, 101, 202, 102, 203, 103]);
        assert_eq!(out.data, expected);
    }

    #[test]
    fn test_semi_planar_stride_two() {
        // Semi-planar chroma, 2-byte row padding, last row tight
        let u = vec![10, 20, 11, 21, 0, 0, 12, 22, 13];
        let v = vec![20, 10, 21, 11, 0, 0, 22, 12, 23];
        let frame = RawFrame::new(
            4,
            4,
            PlaneBuffer::new(vec![0; 16], 4, 1),
            PlaneBuffer::new(u, 6, 2),
            PlaneBuffer::new(v, 6, 2),
        );

        let out = convert_to_nv21(&frame).expect("conversion");
        assert_eq!(&out.data[16..], &[20, 10, 21, 11, 22, 12, 23, 13]);
    }

    #[test]
    fn test_odd_dimensions_truncate_chroma() {
        let frame = RawFrame::new(
            5,
            3,
            PlaneBuffer::new(vec![1; 15], 5, 1),
            PlaneBuffer::new(vec![2; 2], 2, 1),
            PlaneBuffer::new(vec![3; 2], 2, 1),
        );
        let out = convert_to_nv21(&frame).expect("conversion");
        assert_eq!(out.data.len(), interleaved_len(15, 5, 3));
        assert_eq!(out.data.len(), 15 + 4);
    }

    #[test]
    fn test_short_plane_is_bounds_error() {
        let mut frame = planar_frame(4, 4);
        frame.v.data.truncate(3);

        let err = convert_to_nv21(&frame).unwrap_err();
        assert_eq!(
            err,
            PipelineError::BufferBounds {
                plane: Plane::V,
                index: 3,
                len: 3
            }
        );
    }

    #[test]
    fn test_convert_into_reuses_buffer() {
        let frame = planar_frame(8, 8);
        let mut scratch = Vec::with_capacity(1024);
        convert_into(&frame, &mut scratch).expect("first");
        convert_into(&frame, &mut scratch).expect("second");
        assert_eq!(scratch.len(), 64 + 32);
        assert!(scratch.capacity() >= 1024);
    }

    #[test]
    fn test_i420_split() {
        let mut data: Vec<u8> = vec![7; 16];
        data.extend_from_slice(&[1, 2, 3, 4]);
        data.extend_from_slice(&[5, 6, 7, 8]);

        let frame = raw_frame_from_i420(&data, 4, 4).expect("split");
        assert_eq!(frame.u.data, vec![1, 2, 3, 4]);
        assert_eq!(frame.v.data, vec![5, 6, 7, 8]);
        assert!(raw_frame_from_i420(&data[..20], 4, 4).is_err());
    }
}
