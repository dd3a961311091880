// Background colors for generated avatars, dark enough for white initials.
pub const DARK_COLORS: &[&str] = &[
    "1abc9c", "16a085", "2ecc71", "27ae60", "3498db", "2980b9", "9b59b6", "8e44ad", "34495e",
    "2c3e50", "f39c12", "d35400", "e74c3c", "c0392b", "7f8c8d", "617c8c",
];
