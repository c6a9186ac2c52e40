pub mod seed_document;
