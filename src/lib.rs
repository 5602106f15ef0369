pub mod error;
pub mod events;
pub mod instruction;
pub mod math;
pub mod pool;
pub mod processor;
pub mod state;
pub mod transfer;

#[cfg(not(target_os = "solana"))]
pub mod shared;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

pub use processor::process_instruction;

solana_program::declare_id!("CPAmm11111111111111111111111111111111111111");
