pub mod openmeteo;
