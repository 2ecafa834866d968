// Conversion from frame_lab frames to OpenCV mats, plus the overlays the runner
// draws on top: tracked point, region boxes, agents, the flier and the hover
// readout. The library never draws; all presentation lives here.

use anyhow::{Context, Result};
use frame_lab::core_modules::agent::Agent;
use frame_lab::core_modules::flier::Flier;
use frame_lab::core_modules::region::Region;
use frame_lab::{Frame, Pixel, PixelCoord};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

pub fn scalar(pixel: Pixel) -> Scalar {
    Scalar::new(pixel.blue as f64, pixel.green as f64, pixel.red as f64, 0.0)
}

/// Copies `frame` into a fresh 8-bit BGR mat.
pub fn to_mat(frame: &Frame) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    if !frame.is_empty() {
        frame
            .write_bgr_bytes(mat.data_bytes_mut()?)
            .context("copying frame into mat")?;
    }
    Ok(mat)
}

/// A filled dot in the track color, outlined in its inverse so it stays
/// visible against the very color it marks.
pub fn draw_tracked(mat: &mut Mat, point: PixelCoord, color: Pixel) -> Result<()> {
    let center = Point::new(point.col as i32, point.row as i32);
    imgproc::circle(mat, center, 8, scalar(color), imgproc::FILLED, imgproc::LINE_8, 0)?;
    imgproc::circle(mat, center, 8, scalar(color.inverse()), 2, imgproc::LINE_8, 0)?;
    Ok(())
}

pub fn draw_regions(mat: &mut Mat, regions: &[Region], color: Pixel) -> Result<()> {
    for region in regions {
        let (min, max) = region.bounding_box();
        let rect = Rect::new(
            min.col as i32,
            min.row as i32,
            (max.col - min.col + 1) as i32,
            (max.row - min.row + 1) as i32,
        );
        imgproc::rectangle(mat, rect, scalar(color.inverse()), 1, imgproc::LINE_8, 0)?;
    }
    Ok(())
}

pub fn draw_agents(mat: &mut Mat, agents: &[Agent]) -> Result<()> {
    for agent in agents {
        let center = Point::new(agent.x.round() as i32, agent.y.round() as i32);
        let radius = agent.radius.round().max(1.0) as i32;
        imgproc::circle(mat, center, radius, scalar(agent.color), imgproc::FILLED, imgproc::LINE_8, 0)?;
    }
    Ok(())
}

pub fn draw_flier(mat: &mut Mat, flier: &Flier) -> Result<()> {
    let center = Point::new(flier.x.round() as i32, flier.y.round() as i32);
    let radius = flier.radius.round().max(1.0) as i32;
    imgproc::circle(mat, center, radius, scalar(Pixel::WHITE), imgproc::FILLED, imgproc::LINE_8, 0)?;
    imgproc::circle(mat, center, radius, scalar(Pixel::BLACK), 1, imgproc::LINE_8, 0)?;
    Ok(())
}

/// Writes a line of text in the top-left corner, on a dark band.
pub fn draw_caption(mat: &mut Mat, text: &str) -> Result<()> {
    let band = Rect::new(0, 0, mat.cols().min(320), 18.min(mat.rows()));
    imgproc::rectangle(mat, band, scalar(Pixel::BLACK), imgproc::FILLED, imgproc::LINE_8, 0)?;
    imgproc::put_text(
        mat,
        text,
        Point::new(4, 13),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.4,
        scalar(Pixel::WHITE),
        1,
        imgproc::LINE_AA,
        false,
    )?;
    Ok(())
}

pub fn hover_caption((coord, pixel): (PixelCoord, Pixel)) -> String {
    format!(
        "({}, {}) rgb {} {} {}",
        coord.col, coord.row, pixel.red, pixel.green, pixel.blue
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_lab::core_modules::agent::Motion;

    fn bgr_at(mat: &Mat, row: i32, col: i32) -> [u8; 3] {
        mat.at_2d::<core::Vec3b>(row, col).expect("inside the mat").0
    }

    #[test]
    fn agents_are_drawn_over_the_painted_canvas() {
        let canvas = Frame::filled(20, 20, Pixel::new(0, 0, 200));
        let agents = vec![Agent::new(10.0, 10.0, 3.0, Pixel::new(250, 0, 0), Motion::Stationary)];

        let mut mat = to_mat(&canvas).expect("mat from canvas");
        draw_agents(&mut mat, &agents).expect("agents drawn");

        assert_eq!(bgr_at(&mat, 10, 10), [0, 0, 250]);
        assert_eq!(bgr_at(&mat, 0, 0), [200, 0, 0]);
    }

    #[test]
    fn empty_frames_become_empty_mats() {
        let mat = to_mat(&Frame::empty()).expect("empty mat");
        assert!(mat.empty());
    }
}
