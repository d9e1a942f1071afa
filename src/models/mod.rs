pub mod availability;
pub mod calendar;
pub mod chat;
pub mod diary;
pub mod goal;
pub mod notification;
pub mod reward;
pub mod settings;
pub mod streak;
