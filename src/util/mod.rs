mod bounded_deque;
mod vec2d;

#[cfg(test)]
mod tests;

pub use bounded_deque::BoundedDeque;
pub use vec2d::Vec2D;
