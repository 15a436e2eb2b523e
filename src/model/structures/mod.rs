pub mod activity;
pub mod division;
pub mod rank;
pub mod rating;
pub mod score_components;
pub mod week_window;
pub mod weekly_score;
