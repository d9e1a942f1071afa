pub mod appointment_service;
pub mod calendar_grid;
pub mod chat_service;
pub mod diary_service;
pub mod goal_service;
pub mod notification_service;
pub mod reward_service;
pub mod settings_service;
pub mod slot_generator;
pub mod streak_calculator;
