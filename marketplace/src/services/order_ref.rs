// marketplace/src/services/order_ref.rs

use rand_core::{OsRng, RngCore};

pub const ORDER_REF_LEN: usize = 8;

/// Source of human-facing order references. Uniqueness is enforced by the
/// orders table, not here.
pub trait OrderRefGenerator: Send + Sync {
  fn next_ref(&self) -> String;
}

/// `ORDER_REF_LEN` random decimal digits from the OS RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrderRefs;

impl OrderRefGenerator for RandomOrderRefs {
  fn next_ref(&self) -> String {
    generate_order_ref()
  }
}

pub fn generate_order_ref() -> String {
  (0..ORDER_REF_LEN)
    .map(|_| char::from(b'0' + (OsRng.next_u32() % 10) as u8))
    .collect()
}
