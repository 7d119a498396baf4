pub mod answer;
pub mod entity;
pub mod likelihood;
pub mod question;
