/// Typed animatable parameter with master/slave linking.
pub mod param;
