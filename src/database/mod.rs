pub mod db;
pub mod db_structs;
pub mod ledger;
pub mod memory;
