pub mod catalog_controller;
pub mod hall_controller;
pub mod home_controller;
pub mod movie_controller;
pub mod order_controller;
pub mod session_controller;
