// 駆動する側アダプター（REST API）

pub mod identity;
pub mod request_dto;
pub mod response_dto;
pub mod rest_api;
