//! FFI-safe type definitions for status blocks and click events.
//!
//! These types use abi_stable to ensure stable memory layout across
//! different compiler versions and dynamic library boundaries.

use abi_stable::std_types::{ROption, RString};
use abi_stable::StableAbi;

/// FFI-safe semantic state of a status block.
///
/// The host maps each state to theme colors; plugins only declare what
/// kind of information they are showing, never concrete colors.
#[repr(u8)]
#[derive(StableAbi, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfiBlockState {
    Idle = 0,
    Info = 1,
    Good = 2,
    Warning = 3,
    Critical = 4,
    Error = 5,
}

/// FFI-safe renderable output of a plugin for one dispatch cycle.
#[repr(C)]
#[derive(StableAbi, Clone, Debug)]
pub struct FfiBlock {
    /// Text shown on the bar.
    pub full_text: RString,
    /// Shorter variant the bar may substitute when space is tight.
    pub short_text: ROption<RString>,
    /// Semantic state, themed by the host.
    pub state: FfiBlockState,
    /// Ask the bar to draw attention to this block.
    pub urgent: bool,
}

impl FfiBlock {
    /// Convenience constructor for a plain block in the given state.
    pub fn new(full_text: impl Into<RString>, state: FfiBlockState) -> Self {
        Self {
            full_text: full_text.into(),
            short_text: ROption::RNone,
            state,
            urgent: false,
        }
    }
}

/// Modifier-key bits carried in [`FfiClickEvent::modifiers`].
pub mod modifiers {
    pub const SHIFT: u32 = 1 << 0;
    pub const CONTROL: u32 = 1 << 1;
    pub const LOCK: u32 = 1 << 2;
    pub const MOD1: u32 = 1 << 3;
    pub const MOD2: u32 = 1 << 4;
    pub const MOD3: u32 = 1 << 5;
    pub const MOD4: u32 = 1 << 6;
    pub const MOD5: u32 = 1 << 7;
}

/// FFI-safe click event delivered to a plugin's `on_click_event`.
///
/// Coordinates follow the bar protocol: `x`/`y` are absolute pixels,
/// the `relative_*` pair is relative to the clicked block, and the
/// `output_*` pair is relative to the output (monitor) the bar is on.
#[repr(C)]
#[derive(StableAbi, Clone, Debug)]
pub struct FfiClickEvent {
    /// Display name of the clicked plugin.
    pub name: RString,
    /// Numeric instance id of the clicked plugin (dispatch order).
    pub instance: u32,
    /// Pointer button number (1 = left, 2 = middle, 3 = right, ...).
    pub button: u32,
    /// Bitmask of [`modifiers`] held during the click.
    pub modifiers: u32,
    pub x: i32,
    pub y: i32,
    pub relative_x: i32,
    pub relative_y: i32,
    pub output_x: i32,
    pub output_y: i32,
    /// Width of the clicked block in pixels.
    pub width: i32,
    /// Height of the clicked block in pixels.
    pub height: i32,
}

/// Result of a successful plugin `init` negotiation.
#[repr(C)]
#[derive(StableAbi, Clone, Debug)]
pub struct FfiPluginInfo {
    /// Display name the plugin wants to be addressed by.
    ///
    /// Must be non-empty and restricted to `[A-Za-z0-9_-]`; the host
    /// rejects the plugin at startup otherwise.
    pub name: RString,
    /// Whether the plugin wants click events delivered.
    pub click_events: bool,
}
