//! Slot-keyed Gold sequence scrambling.
//!
//! The mask is the length-31 Gold sequence used for LTE downlink data
//! scrambling. The second m-sequence is initialised from the slot index,
//! so every slot of a radio frame gets its own slice of a sequence that
//! repeats once per frame.

use tracing::trace;

use crate::{
    common::{SCRAMBLER_CELL_ID, SCRAMBLER_RNTI, SLOTS_PER_FRAME, SLOT_STEP},
    error::{Error, Result},
};

/// Output bits discarded before the mask starts.
const GOLD_OFFSET: usize = 1600;

/// Register length of both m-sequences.
const REGISTER_LEN: usize = 31;

/// Identifiers mixed into the scrambler initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scrambler {
    rnti: u32,
    codeword: u32,
    cell_id: u32,
}

impl Default for Scrambler {
    fn default() -> Self {
        Self::new(SCRAMBLER_RNTI, 0, SCRAMBLER_CELL_ID)
    }
}

impl Scrambler {
    /// Creates a scrambler for the given RNTI, codeword and cell identity.
    pub fn new(rnti: u32, codeword: u32, cell_id: u32) -> Self {
        Self {
            rnti,
            codeword,
            cell_id,
        }
    }

    /// Initial state of the second m-sequence for slot `slot`.
    fn c_init(&self, slot: u32) -> u32 {
        (self.rnti << 14) + (self.codeword << 13) + ((slot / 2) << 9) + self.cell_id
    }

    /// First `len` mask bits of slot `slot`.
    pub fn sequence(&self, slot: u32, len: usize) -> Result<Vec<u8>> {
        if slot >= SLOTS_PER_FRAME {
            return Err(Error::SlotIndex {
                slot,
                slots: SLOTS_PER_FRAME,
            });
        }

        let c_init = self.c_init(slot);
        let total = len + GOLD_OFFSET + REGISTER_LEN;
        let mut x1 = vec![0u8; total];
        let mut x2 = vec![0u8; total];
        x1[0] = 1;
        for (i, bit) in x2.iter_mut().take(REGISTER_LEN).enumerate() {
            *bit = ((c_init >> i) & 1) as u8;
        }

        for n in 0..total - REGISTER_LEN {
            x1[n + REGISTER_LEN] = x1[n + 3] ^ x1[n];
            x2[n + REGISTER_LEN] = x2[n + 3] ^ x2[n + 2] ^ x2[n + 1] ^ x2[n];
        }

        Ok((0..len)
            .map(|n| x1[n + GOLD_OFFSET] ^ x2[n + GOLD_OFFSET])
            .collect())
    }

    /// XORs `bits` with the mask of slot `slot`.
    pub fn scramble(&self, bits: &[u8], slot: u32) -> Result<Vec<u8>> {
        trace!(slot, len = bits.len(), "Scrambling");
        let mask = self.sequence(slot, bits.len())?;

        Ok(bits.iter().zip(mask).map(|(b, m)| b ^ m).collect())
    }

    /// Undoes [`Scrambler::scramble`] given the same slot.
    ///
    /// A wrong slot does not fail, it silently yields garbage bits.
    pub fn descramble(&self, bits: &[u8], slot: u32) -> Result<Vec<u8>> {
        self.scramble(bits, slot)
    }
}

/// Rolling slot counter of the scrambled link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCounter {
    slot: u32,
}

impl SlotCounter {
    /// Current slot.
    pub fn current(&self) -> u32 {
        self.slot
    }

    /// Moves to the slot of the next block.
    pub fn advance(&mut self) {
        self.slot = (self.slot + SLOT_STEP) % SLOTS_PER_FRAME;
    }

    /// Back to slot zero.
    pub fn reset(&mut self) {
        self.slot = 0;
    }
}
