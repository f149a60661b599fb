//! Seedmine: converts genome-assembly metadata (NCBI assembly reports,
//! taxonomy dumps, GFF3 annotation, FASTA sequences) into a graph of typed
//! biological entities for bulk loading into a genomic data warehouse.

pub mod error;

pub mod assembly_report;
pub mod classify;
pub mod cli;
pub mod config;
pub mod entity;
pub mod fasta;
pub mod feature;
pub mod gff3;
pub mod session;
pub mod sink;
pub mod strand;
pub mod taxonomy;
