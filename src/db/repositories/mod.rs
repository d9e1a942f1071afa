pub mod appointment_repository;
pub mod availability_repository;
pub mod chat_repository;
pub mod diary_repository;
pub mod goal_repository;
pub mod reward_repository;
pub mod settings_repository;
