pub mod calendar;
pub mod checklist;
pub mod dates;
pub mod db;
pub mod models;
pub mod service;
pub mod voice;
