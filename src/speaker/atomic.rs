use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// An `f32` which can be shared between audio callbacks without locking.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, val: f32) {
        self.0.store(val.to_bits(), Ordering::Release);
    }
}

/// A pair of `f32`s read and written as a single unit.
///
/// Both halves live in one `AtomicU64`, so a reader can never observe one
/// half of an update without the other.
#[derive(Debug, Default)]
pub struct AtomicF32Pair(AtomicU64);

impl AtomicF32Pair {
    pub fn new(val: [f32; 2]) -> Self {
        Self(AtomicU64::new(pack(val)))
    }

    #[inline]
    pub fn load(&self) -> [f32; 2] {
        unpack(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, val: [f32; 2]) {
        self.0.store(pack(val), Ordering::Release);
    }
}

#[inline]
fn pack(val: [f32; 2]) -> u64 {
    (u64::from(val[0].to_bits()) << 32) | u64::from(val[1].to_bits())
}

#[inline]
fn unpack(val: u64) -> [f32; 2] {
    [
        f32::from_bits((val >> 32) as u32),
        f32::from_bits(val as u32),
    ]
}
