pub mod contract;
pub mod history;
pub mod instrument;
pub mod rating;
pub mod recommendation;
pub mod report;
pub mod result;
pub mod tier;
