pub use super::categories::Entity as Categories;
pub use super::companies::Entity as Companies;
pub use super::contracts::Entity as Contracts;
pub use super::current_locations::Entity as CurrentLocations;
pub use super::departments::Entity as Departments;
pub use super::employees::Entity as Employees;
pub use super::equipments::Entity as Equipments;
pub use super::movements::Entity as Movements;
pub use super::profiles::Entity as Profiles;
pub use super::replace_pairs::Entity as ReplacePairs;
pub use super::users::Entity as Users;
