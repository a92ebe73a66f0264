//! 订单号校验
//!
//! 订单号为纯数字串，末位为 Luhn（mod 10）校验位。

use crate::error::{LedgerError, Result};

/// 判断数字串是否满足 Luhn 校验
///
/// 空串或包含非数字字符时返回 false。
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (i, ch) in number.bytes().rev().enumerate() {
        if !ch.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(ch - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

/// 规范化并校验订单号
///
/// 去掉首尾空白后必须是合法的 Luhn 数字串，返回规范化后的订单号。
pub fn validate_order_number(raw: &str) -> Result<String> {
    let number = raw.trim();
    if is_valid(number) {
        Ok(number.to_string())
    } else {
        Err(LedgerError::InvalidFormat(number.to_string()))
    }
}
