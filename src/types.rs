/// Packed 8-bit RGBA color. The red channel occupies the low byte
/// (`0xAABBGGRR`), matching the byte order of an RGBA raster in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const BLACK: Color = Color(0xFF00_0000);
    /// Light gray painted into the margin band of a bordered blit.
    pub const MARGIN_FILL: Color = Color(0xFFE8_E8E8);

    pub const fn from_packed(value: u32) -> Self {
        Color(value)
    }

    pub const fn packed(self) -> u32 {
        self.0
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color((r as u32) | (g as u32) << 8 | (b as u32) << 16 | (a as u32) << 24)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::rgba(r, g, b, 255)
    }

    pub const fn r(self) -> u8 {
        self.0 as u8
    }

    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), self.a()]
    }

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    pub fn to_f32(self) -> ColorF {
        ColorF {
            r: self.r() as f32 / 255.0,
            g: self.g() as f32 / 255.0,
            b: self.b() as f32 / 255.0,
            a: self.a() as f32 / 255.0,
        }
    }

    /// Accepts `#RRGGBB`, `#RRGGBBAA`, or a packed `0xAABBGGRR` literal.
    pub fn parse(raw: &str) -> Option<Color> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix('#') {
            let channel = |idx: usize| u8::from_str_radix(hex.get(idx..idx + 2)?, 16).ok();
            return match hex.len() {
                6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
                8 => Some(Color::rgba(
                    channel(0)?,
                    channel(2)?,
                    channel(4)?,
                    channel(6)?,
                )),
                _ => None,
            };
        }
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))?;
        if hex.is_empty() || hex.len() > 8 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Color::from_packed)
    }
}

/// Floating-point color with every channel in `0.0..=1.0`, used for blending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorF {
    pub fn to_color(self) -> Color {
        Color::rgba(
            quantize(self.r),
            quantize(self.g),
            quantize(self.b),
            quantize(self.a),
        )
    }

    /// `weight * self + (1 - weight) * under`, per channel.
    pub fn mix(self, under: ColorF, weight: f32) -> ColorF {
        let keep = 1.0 - weight;
        ColorF {
            r: weight * self.r + keep * under.r,
            g: weight * self.g + keep * under.g,
            b: weight * self.b + keep * under.b,
            a: weight * self.a + keep * under.a,
        }
    }
}

fn quantize(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A4 portrait at 300 DPI.
    pub const fn a4_300dpi() -> Self {
        Self::new(2480, 3508)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Spacing added around each packed asset, split evenly between both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GapSize {
    pub x: u32,
    pub y: u32,
}

impl GapSize {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub const fn uniform(value: u32) -> Self {
        Self::new(value, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}
