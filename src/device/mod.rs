pub mod adb;
pub mod driver;
pub mod finder;
