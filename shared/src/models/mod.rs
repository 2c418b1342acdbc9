//! Data models shared between the server and admin tooling

pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod tag;

pub use cart::CartItem;
pub use category::{Category, CategoryCreate};
pub use order::{Order, OrderLineItem, OrderStatus, ShippingAddress};
pub use product::{Product, ProductCreate, ProductStatus, ProductUpdate, Variant};
pub use tag::{Tag, TagCreate};
