//! Banner messages shown after a form post redirects back to a page.

use aset_anak_shared::validate::ValidationError;
use serde::Serialize;

use crate::service::{RemoteError, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LoginFailed,
    RegisterFailed,
    Registered,
    EmailTaken,
    RegistrationClosed,
    InvalidEmail,
    PasswordTooShort,
    PasswordMismatch,
    LoadFailed,
    ChildNotFound,
    ChildNameRequired,
    BirthdateInvalid,
    BirthdateInFuture,
    ChildAdded,
    ChildAddFailed,
    ChildDeleted,
    ChildDeleteFailed,
    AmountInvalid,
    GoldWeightRequired,
    GoldWeightInvalid,
    AssetAdded,
    AssetAddFailed,
    AssetUpdated,
    AssetUpdateFailed,
    AssetDeleted,
    AssetDeleteFailed,
    CategoryNameRequired,
    CategoryAdded,
    CategoryAddFailed,
    CategoryDeleted,
    CategoryDeleteFailed,
    ConfirmationRequired,
}

use Notice::*;

const ALL: [Notice; 32] = [
    LoginFailed,
    RegisterFailed,
    Registered,
    EmailTaken,
    RegistrationClosed,
    InvalidEmail,
    PasswordTooShort,
    PasswordMismatch,
    LoadFailed,
    ChildNotFound,
    ChildNameRequired,
    BirthdateInvalid,
    BirthdateInFuture,
    ChildAdded,
    ChildAddFailed,
    ChildDeleted,
    ChildDeleteFailed,
    AmountInvalid,
    GoldWeightRequired,
    GoldWeightInvalid,
    AssetAdded,
    AssetAddFailed,
    AssetUpdated,
    AssetUpdateFailed,
    AssetDeleted,
    AssetDeleteFailed,
    CategoryNameRequired,
    CategoryAdded,
    CategoryAddFailed,
    CategoryDeleted,
    CategoryDeleteFailed,
    ConfirmationRequired,
];

impl Notice {
    pub fn code(self) -> &'static str {
        match self {
            LoginFailed => "login-failed",
            RegisterFailed => "register-failed",
            Registered => "registered",
            EmailTaken => "email-taken",
            RegistrationClosed => "registration-closed",
            InvalidEmail => "invalid-email",
            PasswordTooShort => "password-short",
            PasswordMismatch => "password-mismatch",
            LoadFailed => "load-failed",
            ChildNotFound => "child-not-found",
            ChildNameRequired => "child-name-required",
            BirthdateInvalid => "birthdate-invalid",
            BirthdateInFuture => "birthdate-future",
            ChildAdded => "child-added",
            ChildAddFailed => "child-add-failed",
            ChildDeleted => "child-deleted",
            ChildDeleteFailed => "child-delete-failed",
            AmountInvalid => "amount-invalid",
            GoldWeightRequired => "gold-weight-required",
            GoldWeightInvalid => "gold-weight-invalid",
            AssetAdded => "asset-added",
            AssetAddFailed => "asset-add-failed",
            AssetUpdated => "asset-updated",
            AssetUpdateFailed => "asset-update-failed",
            AssetDeleted => "asset-deleted",
            AssetDeleteFailed => "asset-delete-failed",
            CategoryNameRequired => "category-name-required",
            CategoryAdded => "category-added",
            CategoryAddFailed => "category-add-failed",
            CategoryDeleted => "category-deleted",
            CategoryDeleteFailed => "category-delete-failed",
            ConfirmationRequired => "confirm-required",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        ALL.into_iter().find(|n| n.code() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            LoginFailed => "Ralat semasa log masuk",
            RegisterFailed => "Ralat semasa pendaftaran",
            Registered => "Pendaftaran berjaya. Selamat datang!",
            EmailTaken => "Emel ini telah didaftarkan",
            RegistrationClosed => "Pendaftaran akaun baru ditutup",
            InvalidEmail => "Alamat emel tidak sah",
            PasswordTooShort => "Kata laluan mestilah sekurang-kurangnya 6 aksara",
            PasswordMismatch => "Kata laluan tidak sepadan",
            LoadFailed => "Ralat semasa mendapatkan data",
            ChildNotFound => "Rekod anak tidak dijumpai",
            ChildNameRequired => "Sila isi nama anak",
            BirthdateInvalid => "Tarikh lahir tidak sah",
            BirthdateInFuture => "Tarikh lahir tidak boleh melebihi hari ini",
            ChildAdded => "Anak berjaya ditambah",
            ChildAddFailed => "Ralat semasa menambah anak",
            ChildDeleted => "Rekod anak berjaya dipadam",
            ChildDeleteFailed => "Ralat semasa memadam rekod anak",
            AmountInvalid => "Sila isi jumlah yang sah",
            GoldWeightRequired => "Sila isi berat emas",
            GoldWeightInvalid => "Berat emas tidak sah",
            AssetAdded => "Aset berjaya ditambah",
            AssetAddFailed => "Ralat semasa menambah aset",
            AssetUpdated => "Aset berjaya dikemaskini",
            AssetUpdateFailed => "Ralat semasa mengemaskini aset",
            AssetDeleted => "Aset berjaya dipadam",
            AssetDeleteFailed => "Ralat semasa memadam aset",
            CategoryNameRequired => "Sila isi nama kategori",
            CategoryAdded => "Kategori berjaya ditambah",
            CategoryAddFailed => "Ralat semasa menambah kategori",
            CategoryDeleted => "Kategori berjaya dipadam",
            CategoryDeleteFailed => "Ralat semasa memadam kategori",
            ConfirmationRequired => "Sila sahkan pemadaman terlebih dahulu",
        }
    }

    pub fn is_error(self) -> bool {
        !matches!(
            self,
            Registered
                | ChildAdded
                | ChildDeleted
                | AssetAdded
                | AssetUpdated
                | AssetDeleted
                | CategoryAdded
                | CategoryDeleted
        )
    }

    /// Picks the most specific banner for `err`, or `fallback`.
    pub fn for_error(err: &ServiceError, fallback: Notice) -> Notice {
        match err {
            ServiceError::Validation(v) => match v {
                ValidationError::EmptyChildName => ChildNameRequired,
                ValidationError::EmptyCategoryName => CategoryNameRequired,
                ValidationError::InvalidAmount(_) => AmountInvalid,
                ValidationError::MissingGoldWeight => GoldWeightRequired,
                ValidationError::InvalidWeight(_) => GoldWeightInvalid,
                ValidationError::InvalidBirthdate(_) => BirthdateInvalid,
                ValidationError::FutureBirthdate => BirthdateInFuture,
                ValidationError::InvalidEmail => InvalidEmail,
                ValidationError::PasswordTooShort => PasswordTooShort,
                ValidationError::PasswordMismatch => PasswordMismatch,
                ValidationError::ConfirmationRequired => ConfirmationRequired,
            },
            ServiceError::Remote(RemoteError::EmailTaken) => EmailTaken,
            ServiceError::Remote(RemoteError::RegistrationClosed) => RegistrationClosed,
            _ => fallback,
        }
    }

    /// `path` with this notice attached.
    pub fn redirect_url(self, path: &str) -> String {
        format!("{}?notice={}", path, self.code())
    }

    pub fn view(self) -> NoticeView {
        NoticeView {
            message: self.message(),
            level: if self.is_error() { "error" } else { "success" },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub message: &'static str,
    pub level: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_are_unique() {
        for n in ALL {
            assert_eq!(Notice::from_code(n.code()), Some(n));
        }
        assert_eq!(Notice::from_code("nope"), None);
    }

    #[test]
    fn validation_errors_pick_specific_banners() {
        let err = ServiceError::Validation(ValidationError::MissingGoldWeight);
        assert_eq!(Notice::for_error(&err, AssetAddFailed).message(), "Sila isi berat emas");
        let err = ServiceError::NotFound("child x".into());
        assert_eq!(Notice::for_error(&err, AssetAddFailed), AssetAddFailed);
        assert!(!ChildAdded.is_error());
        assert_eq!(
            PasswordMismatch.redirect_url("/register"),
            "/register?notice=password-mismatch"
        );
    }
}
