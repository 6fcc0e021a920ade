pub mod annotations;
pub mod candle;
pub mod interval;
pub mod payload;
pub mod request_params;
