//! Concrete providers behind the `services` traits.

pub mod datamall;
pub mod supabase;
