const SUBSCRIPT_DIGITS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];

fn to_unicode(number: usize, digits: &[char; 10]) -> String {
    if number == 0 {
        return digits[0].to_string();
    }
    let mut num = number;
    let mut digit_stack = Vec::new();
    while num != 0 {
        digit_stack.push(digits[num % 10]);
        num /= 10;
    }
    digit_stack.drain(..).rev().collect()
}

pub fn to_subscript(number: usize) -> String {
    to_unicode(number, &SUBSCRIPT_DIGITS)
}

/// Decimal value of an ascii or subscript digit.
pub fn digit_value(c: char) -> Option<u32> {
    c.to_digit(10).or_else(|| {
        SUBSCRIPT_DIGITS
            .iter()
            .position(|&d| d == c)
            .map(|p| p as u32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_digits() {
        assert_eq!(to_subscript(0), "₀");
        assert_eq!(to_subscript(120), "₁₂₀");
    }

    #[test]
    fn digit_values() {
        assert_eq!(digit_value('4'), Some(4));
        assert_eq!(digit_value('₉'), Some(9));
        assert_eq!(digit_value('x'), None);
    }
}
