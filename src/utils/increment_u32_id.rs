/// Returns the id after `current`, wrapping at `u32::MAX` and skipping 0.
///
/// Id 0 is reserved for one-way calls, which never receive a response.
#[inline]
pub fn increment_u32_id(current: u32) -> u32 {
    match current.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_zero_on_wraparound() {
        assert_eq!(increment_u32_id(0), 1);
        assert_eq!(increment_u32_id(41), 42);
        assert_eq!(increment_u32_id(u32::MAX), 1);
    }
}
