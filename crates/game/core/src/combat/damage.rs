//! Damage formulas shared by both sides of a fight.

/// Fraction of a `dmg_<element>` bonus that is added to the base attack.
pub const DAMAGE_BONUS_FACTOR: f64 = 0.1;

/// Elemental attack value after applying the damage bonus.
///
/// # Formula
///
/// ```text
/// floor(base_attack + bonus_damage * 0.1)
/// ```
pub fn elemental_damage(base_attack: i32, bonus_damage: i32) -> i32 {
    (f64::from(base_attack) + f64::from(bonus_damage) * DAMAGE_BONUS_FACTOR).floor() as i32
}

/// Damage that lands after the defender's resistance.
///
/// # Formula
///
/// ```text
/// round(attack * (1 - resistance_percent / 100))
/// ```
///
/// Resistances above 100% would produce negative damage; the result is
/// clamped to zero instead.
pub fn applied_damage(attack: i32, resistance_percent: i32) -> i32 {
    let landed = f64::from(attack) * (1.0 - f64::from(resistance_percent) / 100.0);
    (landed.round() as i32).max(0)
}
