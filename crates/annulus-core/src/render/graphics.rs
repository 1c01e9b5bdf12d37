//! Rasterizing surface for embedded-graphics targets
//!
//! Filled paths are tessellated into triangles: polygons as a fan around the
//! first vertex, sectors as a strip of quads no wider than two degrees.

use core::f32::consts::PI;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Triangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use libm::{ceilf, roundf};

use super::surface::{FilledPath, Surface, SurfaceBounds, TextSize};
use crate::geometry::{ArcSector, Point2};

/// Widest angular step of a tessellated sector
pub const MAX_SECTOR_STEP_RAD: f32 = 2.0 * PI / 180.0;

/// Surface drawing onto any RGB565 [`DrawTarget`]
pub struct GraphicsSurface<'a, D>
where
    D: DrawTarget<Color = Rgb565>,
{
    target: &'a mut D,
    cutout_bottom_inset: u32,
}

impl<'a, D> GraphicsSurface<'a, D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(target: &'a mut D, cutout_bottom_inset: u32) -> Self {
        Self {
            target,
            cutout_bottom_inset,
        }
    }

    fn fill_triangle(&mut self, a: Point2, b: Point2, c: Point2, color: Rgb565) -> Result<(), D::Error> {
        Triangle::new(to_pixel(a), to_pixel(b), to_pixel(c))
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(&mut *self.target)
    }

    fn fill_polygon(&mut self, points: &[Point2], color: Rgb565) -> Result<(), D::Error> {
        let Some((&pivot, rest)) = points.split_first() else {
            return Ok(());
        };
        for pair in rest.windows(2) {
            self.fill_triangle(pivot, pair[0], pair[1], color)?;
        }
        Ok(())
    }

    fn fill_sector(&mut self, sector: &ArcSector, color: Rgb565) -> Result<(), D::Error> {
        let steps = (ceilf(sector.sweep / MAX_SECTOR_STEP_RAD) as u32).max(1);
        let step = sector.sweep / steps as f32;

        for i in 0..steps {
            let from = sector.start + step * i as f32;
            let to = from + step;
            let inner_from = sector.point_at(from, sector.inner_radius);
            let outer_from = sector.point_at(from, sector.outer_radius);
            let inner_to = sector.point_at(to, sector.inner_radius);
            let outer_to = sector.point_at(to, sector.outer_radius);

            self.fill_triangle(inner_from, outer_from, outer_to, color)?;
            self.fill_triangle(inner_from, outer_to, inner_to, color)?;
        }
        Ok(())
    }
}

impl<D> Surface for GraphicsSurface<'_, D>
where
    D: DrawTarget<Color = Rgb565>,
{
    type Error = D::Error;

    fn bounds(&self) -> SurfaceBounds {
        let size = self.target.bounding_box().size;
        SurfaceBounds {
            width: size.width,
            height: size.height,
            cutout_bottom_inset: self.cutout_bottom_inset,
        }
    }

    fn clear(&mut self, color: Rgb565) -> Result<(), Self::Error> {
        self.target.clear(color)
    }

    fn line(
        &mut self,
        from: Point2,
        to: Point2,
        width: u32,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        Line::new(to_pixel(from), to_pixel(to))
            .into_styled(PrimitiveStyle::with_stroke(color, width))
            .draw(&mut *self.target)
    }

    fn filled_circle(
        &mut self,
        center: Point2,
        radius: f32,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        let diameter = roundf(radius * 2.0).max(1.0) as u32;
        Circle::with_center(to_pixel(center), diameter)
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(&mut *self.target)
    }

    fn filled_path(&mut self, path: &FilledPath<'_>, color: Rgb565) -> Result<(), Self::Error> {
        match path {
            FilledPath::Polygon(points) => self.fill_polygon(points, color),
            FilledPath::Sector(sector) => self.fill_sector(sector, color),
        }
    }

    fn text(
        &mut self,
        text: &str,
        position: Point2,
        size: TextSize,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        let character_style = MonoTextStyle::new(size.font(), color);
        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        Text::with_text_style(text, to_pixel(position), character_style, text_style)
            .draw(&mut *self.target)?;
        Ok(())
    }
}

/// Nearest pixel to a point
fn to_pixel(point: Point2) -> Point {
    Point::new(roundf(point.x) as i32, roundf(point.y) as i32)
}
