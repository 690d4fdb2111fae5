use crate::color::Rgb;

/// Pointer id of the mouse
pub const MOUSE_ID: i32 = -1;

/// A mouse or touch contact in normalized texture coordinates
///
/// Coordinates run from 0 to 1 with the origin in the bottom left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Pointer {
    pub id: i32,
    pub texcoord: [f32; 2],
    pub prev_texcoord: [f32; 2],
    pub delta: [f32; 2],
    pub down: bool,
    pub moved: bool,
    pub color: Rgb,
}

impl Pointer {
    pub fn new(id: i32, color: Rgb) -> Pointer {
        Pointer {
            id,
            texcoord: [0.0, 0.0],
            prev_texcoord: [0.0, 0.0],
            delta: [0.0, 0.0],
            down: false,
            moved: false,
            color,
        }
    }

    /// Start a contact at pixel `(x, y)` of a canvas of size `canvas`
    pub fn press(&mut self, id: i32, x: f32, y: f32, canvas: (u32, u32), color: Rgb) {
        self.id = id;
        self.down = true;
        self.moved = false;
        self.texcoord = texcoord(x, y, canvas);
        self.prev_texcoord = self.texcoord;
        self.delta = [0.0, 0.0];
        self.color = color;
    }

    /// Follow the contact to pixel `(x, y)`
    ///
    /// The delta is corrected for the canvas aspect ratio so the injected
    /// force looks the same along both axes.
    pub fn track(&mut self, x: f32, y: f32, canvas: (u32, u32)) {
        let aspect = aspect_ratio(canvas);
        self.prev_texcoord = self.texcoord;
        self.texcoord = texcoord(x, y, canvas);
        self.delta = [
            correct_delta_x(self.texcoord[0] - self.prev_texcoord[0], aspect),
            correct_delta_y(self.texcoord[1] - self.prev_texcoord[1], aspect),
        ];
        self.moved = self.delta[0].abs() > 0.0 || self.delta[1].abs() > 0.0;
    }

    pub fn release(&mut self) {
        self.down = false;
    }

    /// Consume a pending move, returning whether there was one
    ///
    /// The delta itself is left in place; only `moved` gates the force.
    pub fn take_move(&mut self) -> bool {
        std::mem::replace(&mut self.moved, false)
    }
}

pub fn aspect_ratio((width, height): (u32, u32)) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

fn texcoord(x: f32, y: f32, (width, height): (u32, u32)) -> [f32; 2] {
    [
        x / width.max(1) as f32,
        1.0 - y / height.max(1) as f32,
    ]
}

pub fn correct_delta_x(delta: f32, aspect: f32) -> f32 {
    if aspect < 1.0 { delta * aspect } else { delta }
}

pub fn correct_delta_y(delta: f32, aspect: f32) -> f32 {
    if aspect > 1.0 { delta / aspect } else { delta }
}
