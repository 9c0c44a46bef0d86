pub mod api;
pub mod assessment;
pub mod canvas;
pub mod catalog;
pub mod chart;
pub mod compose;
pub mod contact;
pub mod error;
pub mod gateway;
pub mod pdf;
pub mod question_bank;
pub mod record;
pub mod report;
pub mod session;
pub mod sheets;
pub mod strategy;
pub mod text;
