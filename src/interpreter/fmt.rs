//! The `printf`/`sprintf` format language.
//!
//! A conversion is `%`, optional flags `- + space 0 #`, optional width,
//! optional `.precision`, then one verb character. Unknown verbs are a
//! `bad verb` error, running out of arguments a `bad argc` error.
use crate::{errors::EvaluationError, interpreter::value::Value};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Specifier {
    Char,
    SignedDecimal,
    UnsignedOctal,
    UnsignedDecimal,
    HexLower,
    HexUpper,
    ExponentialLower,
    ExponentialUpper,
    Float,
    GeneralLower,
    GeneralUpper,
    HexFloatLower,
    HexFloatUpper,
    Str,
}

impl Specifier {
    fn new(c: char) -> Option<Specifier> {
        match c {
            'c' => Some(Specifier::Char),
            'd' | 'i' => Some(Specifier::SignedDecimal),
            'o' => Some(Specifier::UnsignedOctal),
            'u' => Some(Specifier::UnsignedDecimal),
            'x' => Some(Specifier::HexLower),
            'X' => Some(Specifier::HexUpper),
            'e' => Some(Specifier::ExponentialLower),
            'E' => Some(Specifier::ExponentialUpper),
            'f' | 'F' => Some(Specifier::Float),
            'g' => Some(Specifier::GeneralLower),
            'G' => Some(Specifier::GeneralUpper),
            'a' => Some(Specifier::HexFloatLower),
            'A' => Some(Specifier::HexFloatUpper),
            's' => Some(Specifier::Str),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Conversion {
    left_justified: bool,
    signed: bool,
    space: bool,
    alternative_form: bool,
    leading_zeros: bool,
    width: Option<usize>,
    precision: Option<usize>,
    specifier: Specifier,
}

impl Conversion {
    /// Parses everything after the `%`. On failure returns the spelling
    /// consumed so far for the `bad verb` message.
    fn parse(iter: &mut Peekable<Chars>) -> Result<Conversion, String> {
        let mut conv = Conversion {
            left_justified: false,
            signed: false,
            space: false,
            alternative_form: false,
            leading_zeros: false,
            width: None,
            precision: None,
            specifier: Specifier::Str,
        };
        let mut spelling = String::new();
        while let Some(&c) = iter.peek() {
            match c {
                '-' => conv.left_justified = true,
                '+' => conv.signed = true,
                ' ' => conv.space = true,
                '#' => conv.alternative_form = true,
                '0' => conv.leading_zeros = true,
                _ => break,
            }
            spelling.push(c);
            iter.next();
        }
        let mut width = String::new();
        while let Some(&c) = iter.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            width.push(c);
            spelling.push(c);
            iter.next();
        }
        if !width.is_empty() {
            conv.width = width.parse().ok();
        }
        if let Some('.') = iter.peek() {
            spelling.push('.');
            iter.next();
            let mut precision = String::new();
            while let Some(&c) = iter.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                precision.push(c);
                spelling.push(c);
                iter.next();
            }
            conv.precision = Some(precision.parse().unwrap_or(0));
        }
        match iter.next() {
            None => Err(spelling),
            Some(c) => {
                spelling.push(c);
                match Specifier::new(c) {
                    Some(specifier) => {
                        conv.specifier = specifier;
                        Ok(conv)
                    },
                    None => Err(spelling),
                }
            },
        }
    }

    fn format(&self, value: &Value, conv: &str) -> Result<String, EvaluationError> {
        Ok(match self.specifier {
            Specifier::Char => self.format_char(value, conv),
            Specifier::SignedDecimal => self.format_decimal(value),
            Specifier::UnsignedOctal
            | Specifier::UnsignedDecimal
            | Specifier::HexLower
            | Specifier::HexUpper => self.format_unsigned(value),
            Specifier::Float => self.format_float(value),
            Specifier::ExponentialLower => self.format_exponential(value, false),
            Specifier::ExponentialUpper => self.format_exponential(value, true),
            Specifier::GeneralLower => self.format_general(value, false),
            Specifier::GeneralUpper => self.format_general(value, true),
            Specifier::HexFloatLower => self.format_hex_float(value, false),
            Specifier::HexFloatUpper => self.format_hex_float(value, true),
            Specifier::Str => self.format_str(value, conv),
        })
    }

    /// Pads `sign + body` out to the field width. `zero_ok` is false where
    /// the standard says the `0` flag is ignored (integers with an explicit
    /// precision, strings).
    fn pad(&self, sign: &str, body: &str, zero_ok: bool) -> String {
        let width = self.width.unwrap_or(0);
        let len = sign.chars().count() + body.chars().count();
        if width <= len {
            return format!("{}{}", sign, body);
        }
        let fill = width - len;
        if self.left_justified {
            format!("{}{}{}", sign, body, " ".repeat(fill))
        } else if self.leading_zeros && zero_ok {
            format!("{}{}{}", sign, "0".repeat(fill), body)
        } else {
            format!("{}{}{}", " ".repeat(fill), sign, body)
        }
    }

    fn sign_for(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.signed {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }

    /// `%c`: first character of a string operand, low byte of a numeric
    /// one.
    fn format_char(&self, value: &Value, conv: &str) -> String {
        if value.is_string() {
            match value.as_string(conv).chars().next() {
                Some(c) => self.pad("", &c.to_string(), false),
                None => String::new(),
            }
        } else {
            let byte = value.as_number().trunc() as i64 as u8;
            char::from(byte).to_string()
        }
    }

    fn integer_body(&self, digits: String, is_zero: bool) -> String {
        match self.precision {
            Some(0) if is_zero => String::new(),
            Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
            _ => digits,
        }
    }

    fn format_decimal(&self, value: &Value) -> String {
        let n = value.as_number().trunc();
        let i = n as i64 as i128;
        let body = self.integer_body(i.abs().to_string(), i == 0);
        self.pad(self.sign_for(i < 0), &body, self.precision.is_none())
    }

    fn format_unsigned(&self, value: &Value) -> String {
        let u = value.as_number().trunc() as i64 as u64;
        let digits = match self.specifier {
            Specifier::UnsignedOctal => format!("{:o}", u),
            Specifier::HexLower => format!("{:x}", u),
            Specifier::HexUpper => format!("{:X}", u),
            _ => u.to_string(),
        };
        let prefix = if self.alternative_form && u != 0 {
            match self.specifier {
                Specifier::UnsignedOctal => "0",
                Specifier::HexLower => "0x",
                Specifier::HexUpper => "0X",
                _ => "",
            }
        } else {
            ""
        };
        let body = self.integer_body(digits, u == 0);
        self.pad(prefix, &body, self.precision.is_none())
    }

    fn format_float(&self, value: &Value) -> String {
        let n = value.as_number();
        if !n.is_finite() {
            return self.pad(self.sign_for(n < 0.0), if n.is_nan() { "nan" } else { "inf" }, false);
        }
        let precision = self.precision.unwrap_or(6);
        let body = format!("{:.*}", precision, n.abs());
        self.pad(self.sign_for(n.is_sign_negative()), &body, true)
    }

    /// Splits a non-negative value into a rounded mantissa string and a
    /// decimal exponent.
    fn exponent_parts(x: f64, precision: usize) -> (String, i32) {
        if x == 0.0 {
            return (format!("{:.*}", precision, 0.0), 0);
        }
        let mut e = x.log10().floor() as i32;
        let mut m = x / 10f64.powi(e);
        if m >= 10.0 {
            m /= 10.0;
            e += 1;
        } else if m < 1.0 {
            m *= 10.0;
            e -= 1;
        }
        let mut mantissa = format!("{:.*}", precision, m);
        // Rounding may carry the mantissa up to 10.
        if mantissa.starts_with("10") {
            m /= 10.0;
            e += 1;
            mantissa = format!("{:.*}", precision, m);
        }
        (mantissa, e)
    }

    fn format_exponential(&self, value: &Value, upper: bool) -> String {
        let n = value.as_number();
        if !n.is_finite() {
            return self.pad(self.sign_for(n < 0.0), if n.is_nan() { "nan" } else { "inf" }, false);
        }
        let precision = self.precision.unwrap_or(6);
        let (mantissa, e) = Conversion::exponent_parts(n.abs(), precision);
        let body = format!("{}{}{:+03}", mantissa, if upper { 'E' } else { 'e' }, e);
        self.pad(self.sign_for(n.is_sign_negative()), &body, true)
    }

    fn trim_zeros(s: &str) -> String {
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_owned()
        } else {
            s.to_owned()
        }
    }

    fn format_general(&self, value: &Value, upper: bool) -> String {
        let n = value.as_number();
        if !n.is_finite() {
            return self.pad(self.sign_for(n < 0.0), if n.is_nan() { "nan" } else { "inf" }, false);
        }
        let p = match self.precision {
            Some(0) => 1,
            Some(p) => p,
            None => 6,
        };
        let x = n.abs();
        let e = Conversion::exponent_parts(x, p.saturating_sub(1)).1;
        let body = if x == 0.0 || (e >= -4 && e < p as i32) {
            let decimals = (p as i32 - 1 - if x == 0.0 { 0 } else { e }) as usize;
            let s = format!("{:.*}", decimals, x);
            if self.alternative_form {
                s
            } else {
                Conversion::trim_zeros(&s)
            }
        } else {
            let (mantissa, e) = Conversion::exponent_parts(x, p - 1);
            let mantissa = if self.alternative_form {
                mantissa
            } else {
                Conversion::trim_zeros(&mantissa)
            };
            format!("{}{}{:+03}", mantissa, if upper { 'E' } else { 'e' }, e)
        };
        self.pad(self.sign_for(n.is_sign_negative()), &body, true)
    }

    fn format_hex_float(&self, value: &Value, upper: bool) -> String {
        let n = value.as_number();
        if !n.is_finite() {
            return self.pad(self.sign_for(n < 0.0), if n.is_nan() { "nan" } else { "inf" }, false);
        }
        let x = n.abs();
        let body = if x == 0.0 {
            "0x0p+0".to_owned()
        } else {
            let bits = x.to_bits();
            let biased = (bits >> 52) & 0x7ff;
            let frac = bits & ((1u64 << 52) - 1);
            let (lead, e) = if biased == 0 {
                ('0', -1022)
            } else {
                ('1', biased as i32 - 1023)
            };
            let mut mantissa = format!("{:013x}", frac);
            match self.precision {
                Some(p) => {
                    mantissa.truncate(p);
                    while mantissa.len() < p {
                        mantissa.push('0');
                    }
                },
                None => {
                    while mantissa.ends_with('0') {
                        mantissa.pop();
                    }
                },
            }
            if mantissa.is_empty() {
                format!("0x{}p{:+}", lead, e)
            } else {
                format!("0x{}.{}p{:+}", lead, mantissa, e)
            }
        };
        let body = if upper { body.to_uppercase() } else { body };
        self.pad(self.sign_for(n.is_sign_negative()), &body, true)
    }

    fn format_str(&self, value: &Value, conv: &str) -> String {
        let s = value.as_string(conv);
        let s = match self.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s,
        };
        self.pad("", &s, false)
    }
}

/// Renders `format` with `args`. `conv` is the active CONVFMT, used when a
/// value needs a string form.
pub fn sprintf(format: &str, args: &[Value], conv: &str) -> Result<String, EvaluationError> {
    let mut out = String::new();
    let mut iter = format.chars().peekable();
    let mut arg = 0;
    while let Some(c) = iter.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match iter.peek() {
            // A trailing '%' is literal, as is '%%'.
            None => out.push('%'),
            Some('%') => {
                iter.next();
                out.push('%');
            },
            Some(_) => {
                if arg >= args.len() {
                    return Err(EvaluationError::BadArgc(
                        "not enough arguments".to_owned(),
                    ));
                }
                let conversion = Conversion::parse(&mut iter)
                    .map_err(|spelling| EvaluationError::BadVerb(format!("%{}", spelling)))?;
                out.push_str(&conversion.format(&args[arg], conv)?);
                arg += 1;
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONV: &str = "%.6g";

    fn fmt1(format: &str, value: Value) -> String {
        sprintf(format, &[value], CONV).unwrap()
    }

    fn assert_conversions(data: &[(&str, Value, &str)]) {
        for (i, (format, arg, expected)) in data.iter().enumerate() {
            assert_eq!(
                &fmt1(format, arg.clone()),
                expected,
                "failed on input[{}]: {:?} {:?}",
                i,
                format,
                arg,
            );
        }
    }

    #[test]
    fn literal_text_and_percent() {
        assert_eq!(fmt1("a%db", Value::from(1.0)), "a1b");
        assert_eq!(sprintf("100%%", &[], CONV).unwrap(), "100%");
        assert_eq!(sprintf("stray %", &[], CONV).unwrap(), "stray %");
    }

    #[test]
    fn signed_decimal() {
        #[rustfmt::skip]
        let data = [
            ("%d",     Value::from(0.0),  "0"),
            ("%.0d",   Value::from(0.0),  ""),
            ("%.0d",   Value::from(4.0),  "4"),
            ("%d",     Value::from(4.2),  "4"),
            ("%d",     Value::from(-4.2), "-4"),
            ("%5d",    Value::from(4.0),  "    4"),
            ("%5d",    Value::from(-4.0), "   -4"),
            ("%5.0d",  Value::from(0.0),  "     "),
            ("%05d",   Value::from(4.0),  "00004"),
            ("%05d",   Value::from(-4.0), "-0004"),
            ("%05.2d", Value::from(4.0),  "   04"),
            ("%-5d",   Value::from(42.0), "42   "),
            ("% d",    Value::from(4.0),  " 4"),
            ("% d",    Value::from(-4.0), "-4"),
            ("%+d",    Value::from(4.0),  "+4"),
            ("%.2d",   Value::from(4.0),  "04"),
            ("%.2d",   Value::from(-4.0), "-04"),
            ("%d",     Value::StrNum("42abc".to_owned()), "42"),
        ];
        assert_conversions(&data);
    }

    #[test]
    fn unsigned_conversions() {
        #[rustfmt::skip]
        let data = [
            ("%o",   Value::from(8.0),    "10"),
            ("%#o",  Value::from(8.0),    "010"),
            ("%x",   Value::from(255.0),  "ff"),
            ("%X",   Value::from(255.0),  "FF"),
            ("%#x",  Value::from(255.0),  "0xff"),
            ("%08x", Value::from(255.0),  "000000ff"),
            ("%u",   Value::from(42.0),   "42"),
            ("%u",   Value::from(-1.0),   "18446744073709551615"),
        ];
        assert_conversions(&data);
    }

    #[test]
    fn float_conversion() {
        #[rustfmt::skip]
        let data = [
            ("%.2f",    Value::from(4.2),  "4.20"),
            ("%.2f",    Value::from(-4.2), "-4.20"),
            ("%.0f",    Value::from(4.2),  "4"),
            ("%.2f",    Value::from(10.0), "10.00"),
            ("%f",      Value::from(4.2),  "4.200000"),
            ("%+.2f",   Value::from(4.2),  "+4.20"),
            ("% .2f",   Value::from(4.2),  " 4.20"),
            ("% .2f",   Value::from(-4.2), "-4.20"),
            ("%010.2f", Value::from(4.2),  "0000004.20"),
            ("%8.2f",   Value::from(4.2),  "    4.20"),
            ("%-8.2f",  Value::from(4.2),  "4.20    "),
        ];
        assert_conversions(&data);
    }

    #[test]
    fn exponent_conversion() {
        #[rustfmt::skip]
        let data = [
            ("%e",     Value::from(0.0),             "0.000000e+00"),
            ("%E",     Value::from(0.0),             "0.000000E+00"),
            ("%e",     Value::from(4.2),             "4.200000e+00"),
            ("%e",     Value::from(4999.2),          "4.999200e+03"),
            ("%e",     Value::from(42.0),            "4.200000e+01"),
            ("%.2e",   Value::from(4.0),             "4.00e+00"),
            ("%.0e",   Value::from(1000.0),          "1e+03"),
            ("%e",     Value::from(1000.0),          "1.000000e+03"),
            ("%e",     Value::from(0.0000000000045), "4.500000e-12"),
            ("%15e",   Value::from(0.0000000000045), "   4.500000e-12"),
            ("%015e",  Value::from(0.0000000000045), "0004.500000e-12"),
            ("%+.0e",  Value::from(0.0),             "+0e+00"),
            ("%.1e",   Value::from(-42.0),           "-4.2e+01"),
        ];
        assert_conversions(&data);
    }

    #[test]
    fn general_conversion() {
        #[rustfmt::skip]
        let data = [
            ("%g",      Value::from(0.0),             "0"),
            ("%g",      Value::from(4.2),             "4.2"),
            ("%g",      Value::from(4999.2),          "4999.2"),
            ("%g",      Value::from(42.0),            "42"),
            ("%.2g",    Value::from(42.2),            "42"),
            ("%.2g",    Value::from(4.2),             "4.2"),
            ("%.0g",    Value::from(4.2),             "4"),
            ("%g",      Value::from(1000000.0),       "1e+06"),
            ("%g",      Value::from(0.0001),          "0.0001"),
            ("%g",      Value::from(0.00001),         "1e-05"),
            ("%g",      Value::from(0.0000000000045), "4.5e-12"),
            ("%010.2g", Value::from(4.2),             "00000004.2"),
            ("%+.2g",   Value::from(-4.2),            "-4.2"),
            ("%.3g",    Value::from(1048576.0),       "1.05e+06"),
        ];
        assert_conversions(&data);
    }

    #[test]
    fn char_conversion() {
        assert_eq!(fmt1("%c", Value::from("hello")), "h");
        assert_eq!(fmt1("%c", Value::from("")), "");
        assert_eq!(fmt1("%c", Value::from(65.0)), "A");
        assert_eq!(fmt1("%3c", Value::from("ab")), "  a");
    }

    #[test]
    fn string_conversion() {
        #[rustfmt::skip]
        let data = [
            ("%s",     Value::from("123456789"), "123456789"),
            ("%5s",    Value::from("123456789"), "123456789"),
            ("%10s",   Value::from("123456789"), " 123456789"),
            ("%-10s?", Value::from("123456789"), "123456789 ?"),
            ("%.5s",   Value::from("123456789"), "12345"),
            ("%10.5s", Value::from("123456789"), "     12345"),
            ("%.0s",   Value::from("123456789"), ""),
            ("%s",     Value::from(16.0),        "16"),
            ("%s",     Value::from(0.5),         "0.5"),
        ];
        assert_conversions(&data);
    }

    #[test]
    fn hex_float_conversion() {
        assert_eq!(fmt1("%a", Value::from(1.0)), "0x1p+0");
        assert_eq!(fmt1("%a", Value::from(2.0)), "0x1p+1");
        assert_eq!(fmt1("%a", Value::from(1.5)), "0x1.8p+0");
        assert_eq!(fmt1("%A", Value::from(1.5)), "0X1.8P+0");
        assert_eq!(fmt1("%a", Value::from(0.0)), "0x0p+0");
    }

    #[test]
    fn errors() {
        let err = sprintf("%d %d", &[Value::from(1.0)], CONV).unwrap_err();
        assert_eq!(err, EvaluationError::BadArgc("not enough arguments".to_owned()));
        let err = sprintf("%q", &[Value::from(1.0)], CONV).unwrap_err();
        assert_eq!(err, EvaluationError::BadVerb("%q".to_owned()));
        let err = sprintf("%.3q", &[Value::from(1.0)], CONV).unwrap_err();
        assert_eq!(err, EvaluationError::BadVerb("%.3q".to_owned()));
    }
}
