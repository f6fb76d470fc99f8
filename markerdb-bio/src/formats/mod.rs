pub mod defline;
pub mod fasta;
