//! Sort code and account number generation
//!
//! Uniqueness is not guaranteed here; the store rejects duplicates and
//! the account service regenerates.

use rand::Rng;

use super::validation::ACCOUNT_NUMBER_LEN;

/// Generates identities for newly opened accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Random `NN-NN-NN` sort code
    pub fn generate_sort_code(&self) -> String {
        sort_code_from(&mut rand::thread_rng())
    }

    /// Random 8-digit account number (leading zeros kept)
    pub fn generate_account_number(&self) -> String {
        account_number_from(&mut rand::thread_rng())
    }
}

fn sort_code_from<R: Rng + ?Sized>(rng: &mut R) -> String {
    let groups: [u8; 3] = [rng.gen_range(0..100), rng.gen_range(0..100), rng.gen_range(0..100)];
    format!("{:02}-{:02}-{:02}", groups[0], groups[1], groups[2])
}

fn account_number_from<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ACCOUNT_NUMBER_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
