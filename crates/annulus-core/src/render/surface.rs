//! Drawing surface abstraction
//!
//! The renderer only ever issues these primitives. [`DrawList`] records them
//! for inspection; [`super::GraphicsSurface`] rasterizes them onto an
//! embedded-graphics target.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;

use crate::geometry::{ArcSector, Point2};

/// Drawable area of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceBounds {
    pub width: u32,
    pub height: u32,
    /// Height of the flat cutout at the bottom of the panel
    pub cutout_bottom_inset: u32,
}

/// Text size presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Small,
    Medium,
    Large,
}

impl TextSize {
    pub fn font(&self) -> &'static MonoFont<'static> {
        match self {
            TextSize::Small => &FONT_6X10,
            TextSize::Medium => &FONT_9X15,
            TextSize::Large => &FONT_10X20,
        }
    }
}

/// Shape handed to [`Surface::filled_path`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilledPath<'a> {
    /// Closed polygon through the given points
    Polygon(&'a [Point2]),
    /// Annular sector
    Sector(ArcSector),
}

/// Primitive drawing operations used by the renderer
pub trait Surface {
    type Error;

    fn bounds(&self) -> SurfaceBounds;

    /// Fill the whole surface
    fn clear(&mut self, color: Rgb565) -> Result<(), Self::Error>;

    fn line(&mut self, from: Point2, to: Point2, width: u32, color: Rgb565)
    -> Result<(), Self::Error>;

    fn filled_circle(&mut self, center: Point2, radius: f32, color: Rgb565)
    -> Result<(), Self::Error>;

    fn filled_path(&mut self, path: &FilledPath<'_>, color: Rgb565) -> Result<(), Self::Error>;

    /// Text centered on `position`
    fn text(
        &mut self,
        text: &str,
        position: Point2,
        size: TextSize,
        color: Rgb565,
    ) -> Result<(), Self::Error>;
}

/// One recorded primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgb565),
    Line {
        from: Point2,
        to: Point2,
        width: u32,
        color: Rgb565,
    },
    Circle {
        center: Point2,
        radius: f32,
        color: Rgb565,
    },
    Polygon {
        points: Vec<Point2>,
        color: Rgb565,
    },
    Sector {
        sector: ArcSector,
        color: Rgb565,
    },
    Text {
        text: String,
        position: Point2,
        size: TextSize,
        color: Rgb565,
    },
}

/// Surface that records every primitive in order
#[derive(Debug, Clone)]
pub struct DrawList {
    bounds: SurfaceBounds,
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(bounds: SurfaceBounds) -> Self {
        Self {
            bounds,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl Surface for DrawList {
    type Error = Infallible;

    fn bounds(&self) -> SurfaceBounds {
        self.bounds
    }

    fn clear(&mut self, color: Rgb565) -> Result<(), Self::Error> {
        self.commands.push(DrawCommand::Clear(color));
        Ok(())
    }

    fn line(
        &mut self,
        from: Point2,
        to: Point2,
        width: u32,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            width,
            color,
        });
        Ok(())
    }

    fn filled_circle(
        &mut self,
        center: Point2,
        radius: f32,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
        Ok(())
    }

    fn filled_path(&mut self, path: &FilledPath<'_>, color: Rgb565) -> Result<(), Self::Error> {
        let command = match path {
            FilledPath::Polygon(points) => DrawCommand::Polygon {
                points: points.to_vec(),
                color,
            },
            FilledPath::Sector(sector) => DrawCommand::Sector {
                sector: *sector,
                color,
            },
        };
        self.commands.push(command);
        Ok(())
    }

    fn text(
        &mut self,
        text: &str,
        position: Point2,
        size: TextSize,
        color: Rgb565,
    ) -> Result<(), Self::Error> {
        self.commands.push(DrawCommand::Text {
            text: String::from(text),
            position,
            size,
            color,
        });
        Ok(())
    }
}
