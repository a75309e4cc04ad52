pub mod category;
pub mod company;
pub mod contract;
pub mod department;
pub mod employee;
pub mod equipment;
pub mod location;
pub mod profile;
pub mod replace_pair;
pub mod user;
pub mod view;
