//! Decoded wheel state tree.
//!
//! The tree has a fixed shape: three groups (`wheel`, `shifter`, `pedals`)
//! with a fixed set of leaves each. [`Field`] enumerates every leaf so the
//! decoder and differ can walk the tree by index instead of by name.

use core::fmt;

use serde::{Deserialize, Serialize};

/// D-pad (hat switch) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dpad {
    #[default]
    Neutral,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl Dpad {
    pub fn as_str(self) -> &'static str {
        match self {
            Dpad::Neutral => "neutral",
            Dpad::Up => "up",
            Dpad::UpRight => "up_right",
            Dpad::Right => "right",
            Dpad::DownRight => "down_right",
            Dpad::Down => "down",
            Dpad::DownLeft => "down_left",
            Dpad::Left => "left",
            Dpad::UpLeft => "up_left",
        }
    }
}

/// Distinguished gear values. Forward gears are `1..=6`.
pub mod gear {
    pub const REVERSE: i8 = -1;
    pub const NEUTRAL: i8 = 0;
}

/// Wheel rim: rotation, paddles, buttons, d-pad, and the rotary spinner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelState {
    /// Rotation, normalized to [-1.0, +1.0] (center = 0.0).
    pub turn: f32,
    pub shift_left: bool,
    pub shift_right: bool,
    pub dpad: Dpad,
    pub button_x: bool,
    pub button_square: bool,
    pub button_triangle: bool,
    pub button_circle: bool,
    pub button_l2: bool,
    pub button_r2: bool,
    pub button_l3: bool,
    pub button_r3: bool,
    pub button_plus: bool,
    pub button_minus: bool,
    /// Detent counter: +1 per clockwise click, -1 per counter-clockwise
    /// click, wrapping modulo 256.
    pub spinner: u8,
    pub button_spinner: bool,
    pub button_share: bool,
    pub button_option: bool,
    pub button_playstation: bool,
}

/// H-pattern shifter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShifterState {
    /// `-1` = reverse, `0` = neutral, `1..=6` = forward gears.
    pub gear: i8,
}

/// Pedal positions, each normalized to [0.0, 1.0] (0 = released).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PedalsState {
    pub gas: f32,
    pub brake: f32,
    pub clutch: f32,
}

/// Complete decoded state of the wheel, shifter, and pedals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelInputState {
    pub wheel: WheelState,
    pub shifter: ShifterState,
    pub pedals: PedalsState,
}

/// Top-level group of the state tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    Wheel,
    Shifter,
    Pedals,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::Wheel, Group::Shifter, Group::Pedals];

    pub fn name(self) -> &'static str {
        match self {
            Group::Wheel => "wheel",
            Group::Shifter => "shifter",
            Group::Pedals => "pedals",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of leaves in the state tree.
pub const FIELD_COUNT: usize = 23;

/// Every leaf of the state tree, in tree order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    WheelTurn,
    WheelShiftLeft,
    WheelShiftRight,
    WheelDpad,
    WheelButtonX,
    WheelButtonSquare,
    WheelButtonTriangle,
    WheelButtonCircle,
    WheelButtonL2,
    WheelButtonR2,
    WheelButtonL3,
    WheelButtonR3,
    WheelButtonPlus,
    WheelButtonMinus,
    WheelSpinner,
    WheelButtonSpinner,
    WheelButtonShare,
    WheelButtonOption,
    WheelButtonPlaystation,
    ShifterGear,
    PedalsGas,
    PedalsBrake,
    PedalsClutch,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::WheelTurn,
        Field::WheelShiftLeft,
        Field::WheelShiftRight,
        Field::WheelDpad,
        Field::WheelButtonX,
        Field::WheelButtonSquare,
        Field::WheelButtonTriangle,
        Field::WheelButtonCircle,
        Field::WheelButtonL2,
        Field::WheelButtonR2,
        Field::WheelButtonL3,
        Field::WheelButtonR3,
        Field::WheelButtonPlus,
        Field::WheelButtonMinus,
        Field::WheelSpinner,
        Field::WheelButtonSpinner,
        Field::WheelButtonShare,
        Field::WheelButtonOption,
        Field::WheelButtonPlaystation,
        Field::ShifterGear,
        Field::PedalsGas,
        Field::PedalsBrake,
        Field::PedalsClutch,
    ];

    /// Position of this field in [`Field::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn group(self) -> Group {
        match self {
            Field::ShifterGear => Group::Shifter,
            Field::PedalsGas | Field::PedalsBrake | Field::PedalsClutch => Group::Pedals,
            _ => Group::Wheel,
        }
    }

    /// Leaf name within its group.
    pub fn name(self) -> &'static str {
        match self {
            Field::WheelTurn => "turn",
            Field::WheelShiftLeft => "shift_left",
            Field::WheelShiftRight => "shift_right",
            Field::WheelDpad => "dpad",
            Field::WheelButtonX => "button_x",
            Field::WheelButtonSquare => "button_square",
            Field::WheelButtonTriangle => "button_triangle",
            Field::WheelButtonCircle => "button_circle",
            Field::WheelButtonL2 => "button_l2",
            Field::WheelButtonR2 => "button_r2",
            Field::WheelButtonL3 => "button_l3",
            Field::WheelButtonR3 => "button_r3",
            Field::WheelButtonPlus => "button_plus",
            Field::WheelButtonMinus => "button_minus",
            Field::WheelSpinner => "spinner",
            Field::WheelButtonSpinner => "button_spinner",
            Field::WheelButtonShare => "button_share",
            Field::WheelButtonOption => "button_option",
            Field::WheelButtonPlaystation => "button_playstation",
            Field::ShifterGear => "gear",
            Field::PedalsGas => "gas",
            Field::PedalsBrake => "brake",
            Field::PedalsClutch => "clutch",
        }
    }

    /// Look a field up by group and leaf name (`"wheel"`, `"turn"`).
    pub fn lookup(group: &str, name: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.group().name() == group && f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.group(), self.name())
    }
}

/// Value of a single leaf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Axis(f32),
    Dpad(Dpad),
    Gear(i8),
    Counter(u8),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{}", u8::from(*v)),
            FieldValue::Axis(v) => write!(f, "{v:.4}"),
            FieldValue::Dpad(v) => f.write_str(v.as_str()),
            FieldValue::Gear(v) => write!(f, "{v}"),
            FieldValue::Counter(v) => write!(f, "{v}"),
        }
    }
}

impl WheelInputState {
    /// Read one leaf.
    pub fn get(&self, field: Field) -> FieldValue {
        let w = &self.wheel;
        match field {
            Field::WheelTurn => FieldValue::Axis(w.turn),
            Field::WheelShiftLeft => FieldValue::Bool(w.shift_left),
            Field::WheelShiftRight => FieldValue::Bool(w.shift_right),
            Field::WheelDpad => FieldValue::Dpad(w.dpad),
            Field::WheelButtonX => FieldValue::Bool(w.button_x),
            Field::WheelButtonSquare => FieldValue::Bool(w.button_square),
            Field::WheelButtonTriangle => FieldValue::Bool(w.button_triangle),
            Field::WheelButtonCircle => FieldValue::Bool(w.button_circle),
            Field::WheelButtonL2 => FieldValue::Bool(w.button_l2),
            Field::WheelButtonR2 => FieldValue::Bool(w.button_r2),
            Field::WheelButtonL3 => FieldValue::Bool(w.button_l3),
            Field::WheelButtonR3 => FieldValue::Bool(w.button_r3),
            Field::WheelButtonPlus => FieldValue::Bool(w.button_plus),
            Field::WheelButtonMinus => FieldValue::Bool(w.button_minus),
            Field::WheelSpinner => FieldValue::Counter(w.spinner),
            Field::WheelButtonSpinner => FieldValue::Bool(w.button_spinner),
            Field::WheelButtonShare => FieldValue::Bool(w.button_share),
            Field::WheelButtonOption => FieldValue::Bool(w.button_option),
            Field::WheelButtonPlaystation => FieldValue::Bool(w.button_playstation),
            Field::ShifterGear => FieldValue::Gear(self.shifter.gear),
            Field::PedalsGas => FieldValue::Axis(self.pedals.gas),
            Field::PedalsBrake => FieldValue::Axis(self.pedals.brake),
            Field::PedalsClutch => FieldValue::Axis(self.pedals.clutch),
        }
    }

    /// Overwrite one leaf.
    ///
    /// Returns `false` and leaves the tree untouched when the value's kind
    /// does not match the field (e.g. an axis value for a button).
    pub fn set(&mut self, field: Field, value: FieldValue) -> bool {
        let w = &mut self.wheel;
        let slot: &mut bool = match (field, value) {
            (Field::WheelTurn, FieldValue::Axis(v)) => {
                w.turn = sanitize(v, -1.0);
                return true;
            }
            (Field::WheelDpad, FieldValue::Dpad(v)) => {
                w.dpad = v;
                return true;
            }
            (Field::WheelSpinner, FieldValue::Counter(v)) => {
                w.spinner = v;
                return true;
            }
            (Field::ShifterGear, FieldValue::Gear(v)) => {
                self.shifter.gear = v;
                return true;
            }
            (Field::PedalsGas, FieldValue::Axis(v)) => {
                self.pedals.gas = sanitize(v, 0.0);
                return true;
            }
            (Field::PedalsBrake, FieldValue::Axis(v)) => {
                self.pedals.brake = sanitize(v, 0.0);
                return true;
            }
            (Field::PedalsClutch, FieldValue::Axis(v)) => {
                self.pedals.clutch = sanitize(v, 0.0);
                return true;
            }
            (Field::WheelShiftLeft, FieldValue::Bool(_)) => &mut w.shift_left,
            (Field::WheelShiftRight, FieldValue::Bool(_)) => &mut w.shift_right,
            (Field::WheelButtonX, FieldValue::Bool(_)) => &mut w.button_x,
            (Field::WheelButtonSquare, FieldValue::Bool(_)) => &mut w.button_square,
            (Field::WheelButtonTriangle, FieldValue::Bool(_)) => &mut w.button_triangle,
            (Field::WheelButtonCircle, FieldValue::Bool(_)) => &mut w.button_circle,
            (Field::WheelButtonL2, FieldValue::Bool(_)) => &mut w.button_l2,
            (Field::WheelButtonR2, FieldValue::Bool(_)) => &mut w.button_r2,
            (Field::WheelButtonL3, FieldValue::Bool(_)) => &mut w.button_l3,
            (Field::WheelButtonR3, FieldValue::Bool(_)) => &mut w.button_r3,
            (Field::WheelButtonPlus, FieldValue::Bool(_)) => &mut w.button_plus,
            (Field::WheelButtonMinus, FieldValue::Bool(_)) => &mut w.button_minus,
            (Field::WheelButtonSpinner, FieldValue::Bool(_)) => &mut w.button_spinner,
            (Field::WheelButtonShare, FieldValue::Bool(_)) => &mut w.button_share,
            (Field::WheelButtonOption, FieldValue::Bool(_)) => &mut w.button_option,
            (Field::WheelButtonPlaystation, FieldValue::Bool(_)) => &mut w.button_playstation,
            _ => return false,
        };
        if let FieldValue::Bool(v) = value {
            *slot = v;
        }
        true
    }
}

/// Clamp an axis into `[min, 1.0]`; NaN collapses to `0.0`.
fn sanitize(v: f32, min: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(min, 1.0)
    }
}
