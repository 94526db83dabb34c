pub mod api_dto;
pub mod attempt_dto;
