use super::{Migration, SimpleSqlMigration};

pub fn migration() -> impl Migration {
    SimpleSqlMigration {
        serial_number: 0,
        sql: vec![
            // KYC statuses are stored as integers, see user::entities::KycStatus.
            r#"
            CREATE TABLE users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                full_name TEXT,
                phone TEXT,
                date_of_birth DATE,
                country TEXT,
                address TEXT,
                coin_balance BIGINT NOT NULL,
                kyc_status INT NOT NULL,
                created TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            r#"CREATE INDEX user_email ON users (email)"#,
            r#"
            CREATE TABLE sessions (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users,
                token_hash TEXT UNIQUE NOT NULL,
                created TIMESTAMP WITH TIME ZONE NOT NULL,
                disabled TIMESTAMP WITH TIME ZONE
            )"#,
            r#"CREATE INDEX session_token_hash ON sessions (token_hash)"#,
            // The newest row is the effective coin price; older rows are kept as history.
            r#"
            CREATE TABLE coin_prices (
                id UUID PRIMARY KEY,
                price DOUBLE PRECISION NOT NULL,
                updated TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            r#"
            CREATE TABLE kyc_submissions (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users,
                full_name TEXT NOT NULL,
                phone TEXT NOT NULL,
                date_of_birth DATE NOT NULL,
                country TEXT NOT NULL,
                address TEXT NOT NULL,
                document TEXT NOT NULL,
                photo TEXT NOT NULL,
                submitted TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            r#"CREATE INDEX kyc_submission_user ON kyc_submissions (user_id)"#,
            r#"
            CREATE TABLE purchases (
                id UUID PRIMARY KEY,
                buyer_id UUID NOT NULL REFERENCES users,
                session_id UUID NOT NULL REFERENCES sessions,
                currency TEXT NOT NULL,
                amount DOUBLE PRECISION NOT NULL,
                coins BIGINT NOT NULL,
                status INT NOT NULL,
                proof TEXT,
                created TIMESTAMP WITH TIME ZONE NOT NULL,
                completed TIMESTAMP WITH TIME ZONE
            )"#,
            r#"CREATE INDEX purchase_buyer ON purchases (buyer_id)"#,
            r#"
            CREATE TABLE deposit_addresses (
                currency TEXT PRIMARY KEY,
                address TEXT NOT NULL,
                updated TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
        ],
    }
}
