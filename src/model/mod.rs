pub mod constants;
pub mod rank_catalog;
pub mod rating_engine;
pub mod ranking_service;
pub mod score_calculator;
pub mod structures;
