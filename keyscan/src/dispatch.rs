//! Keyswitch events handed to the layer above.

use bitflags::bitflags;

use crate::{KeyAddr, KeyMask};

bitflags! {
    /// State of one key across the last two reported scans.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeySwitchState: u8 {
        /// Pressed in the previous reported state.
        const WAS_PRESSED = 0b01;
        /// Pressed in the current reported state.
        const IS_PRESSED = 0b10;
    }
}

impl KeySwitchState {
    pub fn new(was_pressed: bool, is_pressed: bool) -> Self {
        let mut state = Self::empty();
        state.set(Self::WAS_PRESSED, was_pressed);
        state.set(Self::IS_PRESSED, is_pressed);
        state
    }

    pub fn is_pressed(self) -> bool {
        self.contains(Self::IS_PRESSED)
    }

    pub fn was_pressed(self) -> bool {
        self.contains(Self::WAS_PRESSED)
    }

    /// Went down this scan.
    pub fn toggled_on(self) -> bool {
        self == Self::IS_PRESSED
    }

    /// Came up this scan.
    pub fn toggled_off(self) -> bool {
        self == Self::WAS_PRESSED
    }

    /// Down in both scans.
    pub fn is_held(self) -> bool {
        self.is_all()
    }

    pub fn is_transition(self) -> bool {
        self.toggled_on() || self.toggled_off()
    }
}

/// Receiver of keyswitch events.
///
/// Called once per key that is pressed now or was pressed in the previous
/// reported state, in row-major order. Keys that stay released are never
/// reported. The handler may mask or unmask keys as it goes.
pub trait KeyswitchHandler<const ROWS: usize, const COLS: usize> {
    fn handle_keyswitch_event(
        &mut self,
        addr: KeyAddr<ROWS, COLS>,
        state: KeySwitchState,
        masks: &mut KeyMask<ROWS, COLS>,
    );
}

impl<F, const ROWS: usize, const COLS: usize> KeyswitchHandler<ROWS, COLS> for F
where
    F: FnMut(KeyAddr<ROWS, COLS>, KeySwitchState, &mut KeyMask<ROWS, COLS>),
{
    fn handle_keyswitch_event(
        &mut self,
        addr: KeyAddr<ROWS, COLS>,
        state: KeySwitchState,
        masks: &mut KeyMask<ROWS, COLS>,
    ) {
        self(addr, state, masks)
    }
}
