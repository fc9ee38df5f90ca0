pub mod repositories;

pub use repositories::SaleRepository;
