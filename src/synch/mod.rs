pub mod config_cell;
