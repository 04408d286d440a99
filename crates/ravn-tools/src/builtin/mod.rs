pub mod bash;
pub mod weather;
