pub mod commit;
pub mod label;
pub mod package;
pub mod qc;
pub mod replicate;
pub mod session;
