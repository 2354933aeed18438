pub mod address;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod product;
pub mod refresh_token;
pub mod user;

pub use address::Entity as Address;
pub use notification::Entity as Notification;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use refresh_token::Entity as RefreshToken;
pub use user::Entity as User;
